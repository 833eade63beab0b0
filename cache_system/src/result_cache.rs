//! Get-or-compute result cache
//!
//! Values are stored as JSON. Typed row values carry their own type tag (see
//! `type_mapping::FieldValue`), so UUIDs, decimals, dates and timestamps come
//! back out of the cache as the same typed values that went in.
//!
//! There is no mutual exclusion around a miss: concurrent callers with the
//! same key each run `compute` and each write, last writer wins.

use crate::errors::CacheError;
use crate::key::CacheKey;
use crate::store::KeyValueStore;
use config::{CacheConfig, CacheStrictness};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
    default_ttl: u64,
    strictness: CacheStrictness,
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("store", &self.store)
            .field("prefix", &self.prefix)
            .field("default_ttl", &self.default_ttl)
            .field("strictness", &self.strictness)
            .finish()
    }
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: &str) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
            default_ttl: 3600,
            strictness: CacheStrictness::Strict,
        }
    }

    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            prefix: config.key_prefix.clone(),
            default_ttl: config.default_ttl_seconds,
            strictness: config.strictness,
        }
    }

    pub fn with_default_ttl(mut self, ttl_seconds: u64) -> Self {
        self.default_ttl = ttl_seconds;
        self
    }

    pub fn with_strictness(mut self, strictness: CacheStrictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    pub fn strictness(&self) -> CacheStrictness {
        self.strictness
    }

    fn full_key(&self, key: &CacheKey) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }

    /// Read and deserialize a cached value
    pub async fn get<T>(&self, key: &CacheKey) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        match self.store.get(&self.full_key(key)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a value unconditionally
    pub async fn set<T>(&self, key: &CacheKey, value: &T, ttl_seconds: u64) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(&self.full_key(key), &bytes, ttl_seconds).await
    }

    pub async fn exists(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.store.exists(&self.full_key(key)).await
    }

    /// Replace the value of an existing entry. Returns false without writing if absent.
    pub async fn update<T>(&self, key: &CacheKey, value: &T, ttl_seconds: u64) -> Result<bool, CacheError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.store.update(&self.full_key(key), &bytes, ttl_seconds).await
    }

    /// Remove an entry. Returns false if it did not exist.
    pub async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.store.delete(&self.full_key(key)).await
    }

    /// Return the cached value for `key`, or run `compute`, store its result and return it.
    ///
    /// Errors from `compute` are returned as-is and nothing is cached. Store
    /// failures follow the configured strictness: `Strict` surfaces them,
    /// `Lenient` logs them and behaves as a miss.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl_seconds: u64,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send,
        E: From<CacheError>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if ttl_seconds == 0 {
            return Err(CacheError::InvalidTtl(ttl_seconds).into());
        }

        match self.get::<T>(key).await {
            Ok(Some(hit)) => {
                tracing::debug!(key = %key, "result cache hit");
                return Ok(hit);
            }
            Ok(None) => tracing::debug!(key = %key, "result cache miss"),
            Err(e) => self.degrade("read", key, e)?,
        }

        let fresh = compute().await?;

        if let Err(e) = self.set(key, &fresh, ttl_seconds).await {
            self.degrade("write", key, e)?;
        }

        Ok(fresh)
    }

    fn degrade(&self, operation: &str, key: &CacheKey, error: CacheError) -> Result<(), CacheError> {
        match self.strictness {
            CacheStrictness::Strict => Err(error),
            CacheStrictness::Lenient => {
                tracing::warn!(
                    operation = operation,
                    key = %key,
                    error = %error,
                    "cache unavailable, falling through to direct compute"
                );
                Ok(())
            }
        }
    }
}
