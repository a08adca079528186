//! reqwest-backed proxy gateway

use super::{normalize_body, BodyPolicy, GatewayResponse, ProxyGateway, RequestEnvelope};
use crate::error::CoreError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Default upper bound for one proxied request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends envelopes to the proxy endpoint as a JSON POST
pub struct HttpGateway {
    client: reqwest::Client,
    proxy_url: String,
    body_policy: BodyPolicy,
}

impl HttpGateway {
    pub fn new(proxy_url: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
        let proxy_url = proxy_url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Transport {
                path: proxy_url.clone(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            proxy_url,
            body_policy: BodyPolicy::default(),
        })
    }

    pub fn with_body_policy(mut self, policy: BodyPolicy) -> Self {
        self.body_policy = policy;
        self
    }

    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }
}

#[async_trait]
impl ProxyGateway for HttpGateway {
    async fn forward(&self, mut envelope: RequestEnvelope) -> Result<GatewayResponse, CoreError> {
        normalize_body(&mut envelope, self.body_policy)?;

        debug!(method = %envelope.method, path = %envelope.path, "Forwarding request via proxy");

        let transport_error = |e: reqwest::Error| CoreError::Transport {
            path: envelope.path.clone(),
            message: e.to_string(),
        };

        let response = self
            .client
            .post(&self.proxy_url)
            .json(&envelope)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        debug!(path = %envelope.path, status, bytes = text.len(), "Proxy responded");

        Ok(GatewayResponse::from_text(status, &text))
    }
}
