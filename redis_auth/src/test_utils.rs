//! Shared fixtures for unit tests across the crate

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AuthConfig, RedisSettings};
use crate::scheme::AuthScheme;
use crate::storage::{InMemorySessionStore, SessionStore, StorageError};

/// Defaults plus `ttl` and `cookie.ttl` of one minute
pub(crate) fn test_config() -> AuthConfig {
    let redis = RedisSettings {
        host: "127.0.0.1".to_string(),
        port: 6379,
        db: 0,
        password: None,
    };
    let mut config = AuthConfig::new(redis, 60_000);
    config.cookie.ttl = 60_000;
    config
}

pub(crate) fn memory_scheme(config: AuthConfig) -> (AuthScheme, Arc<InMemorySessionStore>) {
    let store = Arc::new(InMemorySessionStore::new(config.prefix_key.clone()));
    let scheme = AuthScheme::new(config, store.clone()).expect("test config should be valid");
    (scheme, store)
}

/// Scheme whose store fails every operation
pub(crate) fn failing_scheme(config: AuthConfig) -> AuthScheme {
    AuthScheme::new(config, Arc::new(FailingStore)).expect("test config should be valid")
}

pub(crate) struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn select(&self, _db: u8) -> Result<(), StorageError> {
        Err(StorageError::Storage("Connection refused".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Storage("Connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Storage("Connection refused".to_string()))
    }

    async fn expire(&self, _key: &str, _ttl_secs: u64) -> Result<(), StorageError> {
        Err(StorageError::Storage("Connection refused".to_string()))
    }
}
