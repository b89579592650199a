use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult};

use crate::config::RedisSettings;

use super::errors::StorageError;
use super::types::{SessionStore, make_key};

/// Redis-backed session store.
///
/// Holds one multiplexed connection that is cloned per operation, so all
/// requests share a single socket. The configured database is part of the
/// connection URL, which keeps reconnects pointed at it.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    prefix: String,
    timeout: Duration,
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisSessionStore {
    /// Connect to Redis and verify the server answers a `PING`.
    #[tracing::instrument(skip(settings), fields(host = %settings.host, port = settings.port, db = settings.db))]
    pub async fn connect(
        settings: &RedisSettings,
        prefix: &str,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = redis::Client::open(settings.connection_url()).map_err(|e| {
            tracing::error!("Failed to create Redis client: {}", e);
            StorageError::from(e)
        })?;

        let mut conn = match tokio::time::timeout(
            timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                tracing::error!("Failed to connect to Redis: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                tracing::error!("Timed out connecting to Redis after {:?}", timeout);
                return Err(StorageError::Timeout(timeout));
            }
        };
        tracing::info!("Connected to Redis");

        let store = Self {
            conn: conn.clone(),
            prefix: prefix.to_string(),
            timeout,
        };
        let pong: String = store
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        tracing::info!("Redis ready: {}", pong);

        Ok(store)
    }

    fn make_key(&self, key: &str) -> String {
        make_key(&self.prefix, key)
    }

    /// Run one Redis round trip under the store deadline.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!("Redis {} failed: {}", op, e);
                Err(e.into())
            }
            Err(_) => {
                tracing::error!("Redis {} timed out after {:?}", op, self.timeout);
                Err(StorageError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn select(&self, db: u8) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded("SELECT", redis::cmd("SELECT").arg(db).query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn.clone();
        let key = self.make_key(key);
        let value: Option<String> = self.bounded("GET", conn.get(&key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let key = self.make_key(key);
        let _: () = self.bounded("SET", conn.set(&key, value)).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let key = self.make_key(key);
        let _: () = self
            .bounded("EXPIRE", conn.expire(&key, ttl_secs as i64))
            .await?;
        Ok(())
    }
}
