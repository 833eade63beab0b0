//! Cached queries against another service's GraphQL endpoint
//!
//! An upstream answer with `"data": null` is treated as transient and retried
//! with exponential backoff, up to the configured number of attempts.
//! Transport and HTTP status errors are not retried.

use crate::errors::RelayError;
use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use cache_system::{CacheKey, ResultCache};
use config::UpstreamConfig;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

/// One GraphQL call. Serializable so it can derive its own cache key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamRequest {
    pub query: String,
    pub variables: Value,
    pub client_name: String,
}

impl UpstreamRequest {
    pub fn new(query: &str, variables: Value, client_name: &str) -> Self {
        Self {
            query: query.to_string(),
            variables,
            client_name: client_name.to_string(),
        }
    }

    pub fn cache_key(&self, call_site: &str) -> Result<CacheKey, RelayError> {
        Ok(CacheKey::derive(call_site, self)?)
    }
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Send the request and return the full response document
    async fn send(&self, request: &UpstreamRequest) -> Result<Value, RelayError>;
}

/// GraphQL over HTTP POST
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpUpstreamClient {
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(client: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn send(&self, request: &UpstreamRequest) -> Result<Value, RelayError> {
        let response = self
            .client
            .post(&self.config.graphql_url)
            .header("apollographql-client-name", &request.client_name)
            .header("apollographql-client-version", &self.config.client_version)
            .header("Authorization", &self.config.graphql_token)
            .json(&json!({
                "query": request.query,
                "variables": request.variables,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Value>().await?)
    }
}

/// Bounded exponential backoff for null-data responses
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl From<&UpstreamConfig> for RetryPolicy {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_interval: Duration::from_millis(config.initial_backoff_ms),
            max_interval: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.multiplier,
        }
    }
}

impl RetryPolicy {
    /// The attempt count bounds the loop, so elapsed time is not capped
    pub fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

fn has_data(response: &Value) -> bool {
    response.get("data").is_some_and(|data| !data.is_null())
}

/// Send `request` until the response carries data or attempts run out
pub async fn query_with_retry<C>(
    client: &C,
    request: &UpstreamRequest,
    policy: &RetryPolicy,
) -> Result<Value, RelayError>
where
    C: UpstreamClient + ?Sized,
{
    let mut attempts = 0;
    let mut backoff = policy.to_backoff();

    loop {
        attempts += 1;
        let response = client.send(request).await?;
        if has_data(&response) {
            return Ok(response);
        }

        if attempts >= policy.max_attempts {
            warn!(
                client = %request.client_name,
                attempts = attempts,
                "Upstream returned no data after max attempts"
            );
            return Err(RelayError::UpstreamExhausted { attempts });
        }

        match backoff.next_backoff() {
            Some(duration) => {
                let retry_ms: u128 = duration.as_millis();
                warn!(
                    client = %request.client_name,
                    attempt = attempts,
                    retry_in_ms = retry_ms,
                    "Upstream returned no data, retrying"
                );
                tokio::time::sleep(duration).await;
            }
            None => return Err(RelayError::UpstreamExhausted { attempts }),
        }
    }
}

/// Return the cached response for `key`, or query upstream (with retry) and
/// cache the response for `ttl_seconds`. Responses without data are never cached.
pub async fn cached_upstream_query<C>(
    cache: Option<&ResultCache>,
    client: &C,
    key: &CacheKey,
    request: &UpstreamRequest,
    ttl_seconds: u64,
    policy: &RetryPolicy,
) -> Result<Value, RelayError>
where
    C: UpstreamClient + ?Sized,
{
    match cache {
        Some(cache) => {
            cache
                .get_or_compute(key, ttl_seconds, move || async move {
                    query_with_retry(client, request, policy).await
                })
                .await
        }
        None => query_with_retry(client, request, policy).await,
    }
}
