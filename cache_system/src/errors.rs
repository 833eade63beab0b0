//! Error types for cache operations
//!
//! This module defines all error types that can occur
//! during cache operations and key-value store interactions.

use thiserror::Error;

/// Cache system errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    ConnectionError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Invalid TTL value: {0}")]
    InvalidTtl(u64),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    /// Whether the error came from the store itself rather than from the data
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            CacheError::ConnectionError(_) | CacheError::Timeout | CacheError::Unavailable(_)
        )
    }
}
