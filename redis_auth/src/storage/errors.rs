use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}
