//! Convenience re-exports for common cache-system usage

// Core cache system components
pub use crate::errors::CacheError;
pub use crate::key::CacheKey;
pub use crate::manager::CacheManager;
pub use crate::result_cache::ResultCache;
pub use crate::store::{KeyValueStore, MemoryStore};

// Re-export centralized config
pub use config::{CacheConfig, CacheStrictness};

// Common external dependencies
pub use async_trait::async_trait;
pub use redis;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;
