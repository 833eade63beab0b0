//! Cache manager implementation
//!
//! This module provides the Redis binding of [`KeyValueStore`]
//! and its connection management.

use crate::errors::CacheError;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use config::CacheConfig;
use redis::{AsyncCommands, Client};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Redis-based key-value store
#[derive(Clone)]
pub struct CacheManager {
    client: Arc<Client>,
    config: Arc<CacheConfig>,
    connection_pool: Arc<RwLock<Option<redis::aio::MultiplexedConnection>>>,
}

impl Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = {
            match self.connection_pool.try_read() {
                Ok(pool) => {
                    if pool.is_some() {
                        "connected"
                    } else {
                        "no_connection"
                    }
                }
                Err(_) => "lock_error",
            }
        };

        f.debug_struct("CacheManager")
            .field("redis_url", &self.config.redis_url)
            .field("key_prefix", &self.config.key_prefix)
            .field("connected", &connection_status)
            .finish()
    }
}

impl CacheManager {
    /// Create a new cache manager. No connection is opened until first use.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            connection_pool: Arc::new(RwLock::new(None)),
        })
    }

    /// Get or create Redis connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        if let Some(connection) = self.connection_pool.read().await.as_ref() {
            return Ok(connection.clone());
        }

        let mut pool = self.connection_pool.write().await;
        if pool.is_none() {
            let connection = self
                .with_timeout(self.client.get_multiplexed_async_connection())
                .await?;
            *pool = Some(connection);
        }

        pool.as_ref()
            .cloned()
            .ok_or_else(|| CacheError::Unavailable("Failed to get connection from pool".into()))
    }

    /// Bound a Redis round trip by the configured timeout
    async fn with_timeout<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        let limit = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(limit, operation).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout),
        }
    }

    /// Drop the cached connection so the next call reconnects
    pub async fn reset_connection(&self) {
        *self.connection_pool.write().await = None;
    }

    /// Get TTL for a key in seconds (-2 if missing, -1 if no expiry)
    pub async fn ttl(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.get_connection().await?;
        self.with_timeout(conn.ttl(key)).await
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<String, CacheError> {
        let mut conn = self.get_connection().await?;
        self.with_timeout(redis::cmd("PING").query_async(&mut conn))
            .await
    }

    /// Get current configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[async_trait]
impl KeyValueStore for CacheManager {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.get_connection().await?;
        self.with_timeout(conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        if ttl_seconds == 0 {
            return Err(CacheError::InvalidTtl(ttl_seconds));
        }

        let mut conn = self.get_connection().await?;
        self.with_timeout(conn.set_ex(key, value.to_vec(), ttl_seconds))
            .await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.get_connection().await?;
        self.with_timeout(conn.exists(key)).await
    }

    async fn update(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<bool, CacheError> {
        if ttl_seconds == 0 {
            return Err(CacheError::InvalidTtl(ttl_seconds));
        }

        let mut conn = self.get_connection().await?;

        // SET .. XX only writes when the key already exists; nil reply means nothing was written
        let reply: Option<String> = self
            .with_timeout(
                redis::cmd("SET")
                    .arg(key)
                    .arg(value.to_vec())
                    .arg("EX")
                    .arg(ttl_seconds)
                    .arg("XX")
                    .query_async(&mut conn),
            )
            .await?;

        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.get_connection().await?;
        let deleted: i32 = self.with_timeout(conn.del(key)).await?;
        Ok(deleted > 0)
    }
}
