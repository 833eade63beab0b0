//! Core RelayHaus functionality
//!
//! `RelayHaus` owns the database pool, the cache clients and the schema
//! registry. Build it once at startup and hand it to resolvers by reference.

use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::RelayError;
use crate::paginator::{Page, PaginationArgs, RelayPaginator};
use crate::upstream::{cached_upstream_query, HttpUpstreamClient, RetryPolicy, UpstreamRequest};
use cache_system::{CacheError, CacheKey, CacheManager, KeyValueStore, ResultCache};
use config::{AppConfig, DatabaseConfig, PaginationConfig, UpstreamConfig};
use store_object::{RawQueryExecutor, SchemaDescriptor, StructuredExecutor};
use type_mapping::{FieldValue, Row};

/// Main RelayHaus coordinator
pub struct RelayHaus {
    pool: PgPool,
    cache: Option<ResultCache>,
    cache_manager: Option<Arc<CacheManager>>,
    pagination: PaginationConfig,
    upstream: Option<UpstreamConfig>,
    schemas: HashMap<String, Arc<SchemaDescriptor>>,
}

impl RelayHaus {
    /// Connect the pool and, when configured, the Redis cache
    pub async fn new(config: AppConfig) -> Result<Self, RelayError> {
        config.validate()?;
        let pool = connect_pool(&config.database).await?;

        let (cache, cache_manager) = match &config.cache {
            Some(cache_config) => {
                let manager = Arc::new(CacheManager::new(cache_config.clone())?);
                let store: Arc<dyn KeyValueStore> = manager.clone();
                (
                    Some(ResultCache::from_config(store, cache_config)),
                    Some(manager),
                )
            }
            None => (None, None),
        };

        tracing::info!(
            host = %config.database.host,
            database = %config.database.database,
            cache = cache.is_some(),
            "relayhaus initialized"
        );

        Ok(Self {
            pool,
            cache,
            cache_manager,
            pagination: config.pagination,
            upstream: config.upstream,
            schemas: HashMap::new(),
        })
    }

    /// Assemble from already-built clients
    pub fn from_parts(pool: PgPool, cache: Option<ResultCache>, pagination: PaginationConfig) -> Self {
        Self {
            pool,
            cache,
            cache_manager: None,
            pagination,
            upstream: None,
            schemas: HashMap::new(),
        }
    }

    pub fn with_upstream(mut self, upstream: UpstreamConfig) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// Register a collection's schema under its collection name
    pub fn register_schema(&mut self, schema: SchemaDescriptor) -> Result<Arc<SchemaDescriptor>, RelayError> {
        let name = schema.collection().to_string();
        if self.schemas.contains_key(&name) {
            return Err(RelayError::CollectionAlreadyRegistered(name));
        }

        let schema = Arc::new(schema);
        self.schemas.insert(name, schema.clone());
        Ok(schema)
    }

    pub fn schema(&self, collection: &str) -> Result<Arc<SchemaDescriptor>, RelayError> {
        self.schemas
            .get(collection)
            .cloned()
            .ok_or_else(|| RelayError::CollectionNotFound(collection.to_string()))
    }

    /// List all registered collection names
    pub fn list_collections(&self) -> Vec<&String> {
        self.schemas.keys().collect()
    }

    pub fn unregister_schema(&mut self, collection: &str) -> Result<(), RelayError> {
        self.schemas
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| RelayError::CollectionNotFound(collection.to_string()))
    }

    /// Uncached paginator for a registered collection
    pub fn paginator(&self, collection: &str) -> Result<RelayPaginator, RelayError> {
        Ok(RelayPaginator::new(self.schema(collection)?).with_config(&self.pagination))
    }

    /// Paginator whose fetches go through the result cache
    pub fn cached_paginator(&self, collection: &str, ttl_seconds: u64) -> Result<RelayPaginator, RelayError> {
        let cache = self.require_cache()?;
        Ok(self.paginator(collection)?.with_cache(cache.clone(), ttl_seconds))
    }

    pub fn structured_executor(&self, collection: &str) -> Result<StructuredExecutor, RelayError> {
        Ok(StructuredExecutor::new(self.pool.clone(), self.schema(collection)?))
    }

    /// Executor over caller-supplied SQL whose rows follow `collection`'s schema
    pub fn raw_executor(&self, collection: &str, sql: &str) -> Result<RawQueryExecutor, RelayError> {
        Ok(RawQueryExecutor::new(self.pool.clone(), self.schema(collection)?, sql))
    }

    /// One page of a registered collection, read from its table
    pub async fn resolve<F, N>(
        &self,
        collection: &str,
        args: &PaginationArgs,
        formatter: F,
    ) -> Result<Page<N>, RelayError>
    where
        F: Fn(&Row) -> N,
    {
        let executor = self.structured_executor(collection)?;
        self.paginator(collection)?
            .paginate(&executor, args, formatter)
            .await
    }

    /// One page of a raw query, `params` bound to its `:name` placeholders
    pub async fn resolve_raw<F, N>(
        &self,
        collection: &str,
        sql: &str,
        params: BTreeMap<String, FieldValue>,
        args: &PaginationArgs,
        formatter: F,
    ) -> Result<Page<N>, RelayError>
    where
        F: Fn(&Row) -> N,
    {
        let executor = self.raw_executor(collection, sql)?;
        self.paginator(collection)?
            .paginate_with_params(&executor, args, params, formatter)
            .await
    }

    pub fn upstream_client(&self) -> Result<HttpUpstreamClient, RelayError> {
        let upstream = self.upstream.as_ref().ok_or_else(|| {
            RelayError::InvalidArgument("no upstream endpoint configured".to_string())
        })?;
        Ok(HttpUpstreamClient::new(upstream.clone()))
    }

    /// Query the configured upstream through the cache (when there is one)
    pub async fn upstream_query(
        &self,
        call_site: &str,
        request: &UpstreamRequest,
        ttl_seconds: u64,
    ) -> Result<serde_json::Value, RelayError> {
        let client = self.upstream_client()?;
        let policy = self
            .upstream
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default();
        let key: CacheKey = request.cache_key(call_site)?;

        cached_upstream_query(self.cache(), &client, &key, request, ttl_seconds, &policy).await
    }

    /// Check database connection health, and the cache when one is configured
    pub async fn health_check(&self) -> Result<(), RelayError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        if let Some(manager) = &self.cache_manager {
            manager.ping().await?;
        }
        Ok(())
    }

    /// Close the pool; in-flight queries finish first
    pub async fn close(&self) {
        self.pool.close().await;
        if let Some(manager) = &self.cache_manager {
            manager.reset_connection().await;
        }
        tracing::info!("relayhaus closed");
    }

    fn require_cache(&self) -> Result<&ResultCache, RelayError> {
        self.cache
            .as_ref()
            .ok_or_else(|| CacheError::Unavailable("no cache configured".to_string()).into())
    }
}

async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, RelayError> {
    let connection_string = config.connection_string();

    let mut pool_options = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

    // Set max lifetime if specified
    if config.max_lifetime_seconds > 0 {
        pool_options = pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
    }

    Ok(pool_options.connect(&connection_string).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_system::MemoryStore;
    use type_mapping::FieldType;

    fn relayhaus(cache: Option<ResultCache>) -> RelayHaus {
        let pool = PgPool::connect_lazy("postgres://localhost/relayhaus").unwrap();
        RelayHaus::from_parts(pool, cache, PaginationConfig::default().with_max_first(25))
    }

    fn orders() -> SchemaDescriptor {
        SchemaDescriptor::builder("Order")
            .table("orders")
            .primary_key("id", FieldType::Int)
            .field("total", FieldType::Decimal)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_schema_registry() {
        let mut relay = relayhaus(None);
        relay.register_schema(orders()).unwrap();

        assert!(matches!(
            relay.register_schema(orders()),
            Err(RelayError::CollectionAlreadyRegistered(name)) if name == "Order"
        ));
        assert_eq!(relay.schema("Order").unwrap().collection(), "Order");
        assert_eq!(relay.list_collections(), vec!["Order"]);

        relay.unregister_schema("Order").unwrap();
        assert!(matches!(
            relay.schema("Order"),
            Err(RelayError::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_paginator_takes_configured_cap() {
        let mut relay = relayhaus(None);
        relay.register_schema(orders()).unwrap();
        let paginator = relay.paginator("Order").unwrap();
        assert_eq!(paginator.page_size(Some(1000)).unwrap(), 25);
    }

    #[tokio::test]
    async fn test_cached_paginator_needs_cache() {
        let mut relay = relayhaus(None);
        relay.register_schema(orders()).unwrap();
        assert!(matches!(
            relay.cached_paginator("Order", 60),
            Err(RelayError::Cache(CacheError::Unavailable(_)))
        ));

        let mut relay = relayhaus(Some(ResultCache::new(Arc::new(MemoryStore::new()), "t")));
        relay.register_schema(orders()).unwrap();
        assert!(relay.cached_paginator("Order", 60).is_ok());
    }

    #[tokio::test]
    async fn test_resolve_unknown_collection() {
        let relay = relayhaus(None);
        let result = relay
            .resolve("Invoice", &PaginationArgs::new(), |row| row.clone())
            .await;
        assert!(matches!(result, Err(RelayError::CollectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_upstream_requires_config() {
        let relay = relayhaus(None);
        assert!(matches!(
            relay.upstream_client(),
            Err(RelayError::InvalidArgument(_))
        ));
    }
}
