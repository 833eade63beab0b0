//! Convenience re-exports for common RelayHaus usage
//!
//! # Example
//!
//! ```rust
//! use relayhaus::prelude::*;
//!
//! let args = PaginationArgs::new().first(5);
//! assert_eq!(args.first, Some(5));
//! ```

// Core RelayHaus components
pub use crate::core::RelayHaus;
pub use crate::cursor::CursorCodec;
pub use crate::errors::{CursorError, RelayError};
pub use crate::paginator::{Edge, Page, PageInfo, PaginationArgs, RelayPaginator};
pub use crate::upstream::{
    cached_upstream_query, HttpUpstreamClient, RetryPolicy, UpstreamClient, UpstreamRequest,
};

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, CacheStrictness, DatabaseConfig, PaginationConfig, UpstreamConfig};

// Schema, predicates, executors and value types
pub use store_object::prelude::*;

// Re-export cache system
pub use cache_system::{CacheError, CacheKey, CacheManager, KeyValueStore, MemoryStore, ResultCache};

// Common external dependencies
pub use anyhow;
pub use serde_json;
pub use sqlx;
pub use tokio;
