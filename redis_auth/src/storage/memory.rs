use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use super::errors::StorageError;
use super::types::{SessionStore, make_key};

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process store with Redis-like semantics, for tests and demos.
///
/// Like a Redis connection, the selected database is connection state: it is
/// shared by every caller of this store.
pub struct InMemorySessionStore {
    prefix: String,
    selected: AtomicU8,
    databases: Mutex<HashMap<u8, HashMap<String, Entry>>>,
}

impl InMemorySessionStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        tracing::info!("Creating new in-memory session store");
        Self {
            prefix: prefix.into(),
            selected: AtomicU8::new(0),
            databases: Mutex::new(HashMap::new()),
        }
    }

    /// Namespaced keys currently alive in database `db`
    pub async fn keys(&self, db: u8) -> Vec<String> {
        let now = Utc::now();
        let databases = self.databases.lock().await;
        let mut keys: Vec<String> = databases
            .get(&db)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, entry)| !entry.is_expired(now))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Remaining TTL of `key` in the selected database, `None` if it has none
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let key = make_key(&self.prefix, key);
        let db = self.selected.load(Ordering::SeqCst);
        let databases = self.databases.lock().await;
        databases
            .get(&db)
            .and_then(|entries| entries.get(&key))
            .and_then(|entry| entry.expires_at)
            .map(|at| at - Utc::now())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn select(&self, db: u8) -> Result<(), StorageError> {
        self.selected.store(db, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let key = make_key(&self.prefix, key);
        let db = self.selected.load(Ordering::SeqCst);
        let mut databases = self.databases.lock().await;
        let Some(entries) = databases.get_mut(&db) else {
            return Ok(None);
        };

        if entries.get(&key).is_some_and(|e| e.is_expired(Utc::now())) {
            entries.remove(&key);
            return Ok(None);
        }

        Ok(entries.get(&key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let key = make_key(&self.prefix, key);
        let db = self.selected.load(Ordering::SeqCst);
        let mut databases = self.databases.lock().await;
        databases.entry(db).or_default().insert(
            key,
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StorageError> {
        let key = make_key(&self.prefix, key);
        let db = self.selected.load(Ordering::SeqCst);
        let mut databases = self.databases.lock().await;
        let Some(entries) = databases.get_mut(&db) else {
            return Ok(());
        };

        if ttl_secs == 0 {
            entries.remove(&key);
        } else if let Some(entry) = entries.get_mut(&key) {
            let expires_at = i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                .ok_or_else(|| {
                    StorageError::Storage(format!("invalid expire time: {ttl_secs}s"))
                })?;
            entry.expires_at = Some(expires_at);
        }
        Ok(())
    }
}
