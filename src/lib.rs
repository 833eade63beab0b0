//! # RelayHaus
//!
//! Relay-style cursor pagination over PostgreSQL for API resolvers, with
//! dynamic filter and search predicates and an optional result cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relayhaus::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let mut relay = RelayHaus::new(config).await?;
//!
//!     relay.register_schema(
//!         SchemaDescriptor::builder("Parcel")
//!             .table("parcels")
//!             .primary_key("id", FieldType::Int)
//!             .field_with("reference", FieldType::Char, FieldConstraints::new().with_max_length(35))
//!             .field("created", FieldType::TimestampTz)
//!             .paginate_on("created")
//!             .build()?,
//!     )?;
//!
//!     let filter = FilterExpression::new().op("reference", "icontains", serde_json::json!("ab"));
//!     let page = relay
//!         .resolve("Parcel", &PaginationArgs::new().first(20).filter(filter), |row| row.to_json())
//!         .await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&page)?);
//!     relay.close().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod cursor;
pub mod errors;
pub mod paginator;
pub mod prelude;
pub mod upstream;

// Re-export the main public types for convenience
pub use crate::core::RelayHaus;
pub use crate::cursor::CursorCodec;
pub use errors::{CursorError, RelayError};
pub use paginator::{Edge, Page, PageInfo, PaginationArgs, RelayPaginator};
pub use upstream::{
    cached_upstream_query, query_with_retry, HttpUpstreamClient, RetryPolicy, UpstreamClient,
    UpstreamRequest,
};

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, CacheStrictness, DatabaseConfig, PaginationConfig, UpstreamConfig};

// Re-export internal crates used in the public API
pub use cache_system;
pub use store_object;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
