//! Error types for the relayhaus crate
//!
//! Every failure surfaces as a typed error. None of them is turned into an
//! empty page.

use cache_system::CacheError;
use config::ConfigError;
use store_object::StoreError;
use thiserror::Error;
use type_mapping::ValueError;

/// Why a cursor was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CursorError {
    #[error("cursor is not valid base64")]
    Encoding,

    #[error("cursor payload is not valid UTF-8")]
    Utf8,

    #[error("cursor payload has no ':' separator")]
    MissingSeparator,

    #[error("cursor belongs to '{found}', expected '{expected}'")]
    CollectionMismatch { expected: String, found: String },

    #[error("cursor value does not fit the pagination field: {0}")]
    Value(#[from] ValueError),
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream returned no data after {attempts} attempts")]
    UpstreamExhausted { attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Collection not registered: {0}")]
    CollectionNotFound(String),

    #[error("Collection already registered: {0}")]
    CollectionAlreadyRegistered(String),
}

impl From<reqwest::Error> for RelayError {
    fn from(error: reqwest::Error) -> Self {
        RelayError::Upstream(error.to_string())
    }
}
