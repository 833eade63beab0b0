//! Cache system for key-value backed result caching
//!
//! This crate provides the key-value store interface, a Redis binding,
//! an in-process binding, cache key derivation and the get-or-compute
//! result cache used by the paginator.

pub mod errors;
pub mod key;
pub mod manager;
pub mod prelude;
pub mod result_cache;
pub mod store;

// Re-export centralized config
pub use config::{CacheConfig, CacheStrictness};

pub use errors::CacheError;
pub use key::CacheKey;
pub use manager::CacheManager;
pub use result_cache::ResultCache;
pub use store::{KeyValueStore, MemoryStore};
