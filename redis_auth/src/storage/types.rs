use async_trait::async_trait;

use super::errors::StorageError;

/// Key-value backend holding serialized sessions.
///
/// Keys passed to these methods are session ids; implementations namespace
/// them as `"{prefix}:{key}"`. Methods take `&self` because one store is
/// shared by every in-flight request; implementations must not hold a lock
/// across a network round trip.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Select the logical database that subsequent operations target.
    async fn select(&self, db: u8) -> Result<(), StorageError>;

    /// Read the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Set the time to live of `key` in seconds. A TTL of zero deletes the key.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StorageError>;
}

pub(super) fn make_key(prefix: &str, key: &str) -> String {
    format!("{prefix}:{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_key() {
        assert_eq!(make_key("auth", "sessionid"), "auth:sessionid");
        assert_eq!(make_key("app:prod", "abc"), "app:prod:abc");
    }
}
