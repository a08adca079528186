//! Paginated collector
//!
//! Turns a page-limited listing endpoint into one complete collection:
//! pages `0, 1, 2, ...` are requested strictly in order and appended until a
//! short page signals the end. Requests are paced with a fixed delay so the
//! upstream rate limiter is not tripped.

pub mod envelope;
pub mod resources;
pub mod retry;

pub use envelope::Envelope;
pub use resources::{ResourceSpec, ShopScope};
pub use retry::RetryPolicy;

use crate::error::CoreError;
use crate::gateway::{GatewayResponse, ProxyGateway, RequestEnvelope};
use crate::models::ResourceKey;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::form_urlencoded;

/// Configuration for the collector
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Records requested per page
    pub page_size: usize,

    /// Pause between consecutive requests (upstream throttling guard)
    pub request_delay: Duration,

    /// Hard stop for runaway pagination
    pub max_pages: usize,

    /// Retry policy applied to each page request
    pub retry: RetryPolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            request_delay: Duration::from_millis(200),
            max_pages: 500,
            retry: RetryPolicy::default(),
        }
    }
}

/// Per-call parameters: credential, shop, extra query parameters
#[derive(Debug, Clone, Default)]
pub struct CollectQuery {
    pub token: String,
    pub shop_id: Option<i64>,
    pub params: Vec<(String, String)>,
}

impl CollectQuery {
    pub fn new(token: impl Into<String>, shop_id: Option<i64>) -> Self {
        Self {
            token: token.into(),
            shop_id,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }
}

/// Complete result of one collection run
#[derive(Debug, Clone)]
pub struct Collection {
    pub key: ResourceKey,
    pub records: Vec<Value>,
    pub pages_fetched: usize,
    /// Stopped early on a malformed page or the page limit
    pub truncated: bool,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Assembles complete collections through a [`ProxyGateway`]
pub struct PaginatedCollector<G> {
    gateway: G,
    config: CollectorConfig,
}

impl<G: ProxyGateway> PaginatedCollector<G> {
    pub fn new(gateway: G, config: CollectorConfig) -> Self {
        Self { gateway, config }
    }

    pub fn with_defaults(gateway: G) -> Self {
        Self::new(gateway, CollectorConfig::default())
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Collect every record of `spec`
    ///
    /// A failed request aborts the run and is returned; a malformed page
    /// ends it with whatever was collected so far.
    pub async fn collect(&self, spec: &ResourceSpec, query: &CollectQuery) -> Result<Collection, CoreError> {
        let (path, mut params) = spec.resolve(query.shop_id)?;
        params.extend(query.params.iter().cloned());

        let mut collection = Collection {
            key: spec.key,
            records: Vec::new(),
            pages_fetched: 0,
            truncated: false,
        };

        if !spec.paginated {
            let response = self.request(&build_path(&path, &params), &query.token).await?;
            collection.pages_fetched = 1;
            match spec.envelope.unwrap(&response.body) {
                Some(records) => collection.records = records,
                None => {
                    warn!(resource = %spec.key, "Malformed payload, treating as no data");
                    collection.truncated = true;
                }
            }
            info!(resource = %spec.key, records = collection.len(), "Collected resource");
            return Ok(collection);
        }

        let page_size = self.config.page_size.max(1);

        for page in 0.. {
            if page >= self.config.max_pages {
                warn!(
                    resource = %spec.key,
                    max_pages = self.config.max_pages,
                    "Page limit reached, stopping collection"
                );
                collection.truncated = true;
                break;
            }

            if page > 0 && !self.config.request_delay.is_zero() {
                sleep(self.config.request_delay).await;
            }

            let mut page_params = params.clone();
            page_params.push(("page".to_string(), page.to_string()));
            page_params.push(("size".to_string(), page_size.to_string()));

            let response = self
                .request(&build_path(&path, &page_params), &query.token)
                .await?;
            collection.pages_fetched += 1;

            let Some(items) = spec.envelope.unwrap(&response.body) else {
                warn!(resource = %spec.key, page, "Malformed page payload, treating as end of data");
                collection.truncated = true;
                break;
            };

            let count = items.len();
            collection.records.extend(items);
            debug!(resource = %spec.key, page, count, total = collection.len(), "Page collected");

            if count < page_size {
                break;
            }
        }

        info!(
            resource = %spec.key,
            records = collection.len(),
            pages = collection.pages_fetched,
            truncated = collection.truncated,
            "Collected resource"
        );

        Ok(collection)
    }

    /// One GET through the gateway with bounded retry
    async fn request(&self, path: &str, token: &str) -> Result<GatewayResponse, CoreError> {
        let retry = &self.config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let envelope = RequestEnvelope::get(path)
                .authorization(token)
                .header("Accept", "application/json");

            let result = match self.gateway.forward(envelope).await {
                Ok(response) => response.error_for_status(path).map(|()| response),
                Err(e) => Err(e),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let backoff = retry.backoff(attempt);
                    warn!(path, attempt, error = %e, backoff_ms = backoff.as_millis() as u64, "Request failed, retrying");
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Append query parameters to `path`, keeping any existing query string
fn build_path(path: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}", path, separator, query)
}
