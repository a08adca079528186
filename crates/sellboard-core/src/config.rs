//! Configuration for sellboard
//!
//! Read from `<config_dir>/sellboard/config.toml` (or an explicit path).
//! Every field has a default, so a missing file or a partial file is fine.

use crate::cache::{CacheConfig, Freshness};
use crate::collector::{CollectorConfig, RetryPolicy};
use crate::error::CoreError;
use crate::gateway::BodyPolicy;
use crate::store::StoreConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PROXY_URL: &str = "http://localhost:8787/api/proxy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellboardConfig {
    /// Proxy endpoint that relays envelopes to the seller API
    pub proxy_url: String,
    pub page_size: usize,
    /// Pause between page requests
    pub request_delay_ms: u64,
    pub max_pages: usize,
    pub cache_ttl_secs: u64,
    pub freshness: Freshness,
    pub request_timeout_secs: u64,
    pub body_policy: BodyPolicy,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for SellboardConfig {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            page_size: 100,
            request_delay_ms: 200,
            max_pages: 500,
            cache_ttl_secs: 300,
            freshness: Freshness::Shared,
            request_timeout_secs: 30,
            body_policy: BodyPolicy::Normalize,
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            multiplier: 2.0,
            max_backoff_ms: 5_000,
        }
    }
}

impl SellboardConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sellboard").join("config.toml"))
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Load from the default location, or defaults when the file is absent
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |message: &str| {
            Err(CoreError::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.proxy_url.trim().is_empty() {
            return invalid("proxy_url must not be empty");
        }
        if self.page_size == 0 {
            return invalid("page_size must be at least 1");
        }
        if self.max_pages == 0 {
            return invalid("max_pages must be at least 1");
        }
        if self.cache_ttl_secs == 0 {
            return invalid("cache_ttl_secs must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            multiplier: self.retry.multiplier,
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            page_size: self.page_size,
            request_delay: Duration::from_millis(self.request_delay_ms),
            max_pages: self.max_pages,
            retry: self.retry_policy(),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            freshness: self.freshness,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            collector: self.collector_config(),
            cache: self.cache_config(),
        }
    }
}
