//! Error types for sellboard-core
//!
//! Provides the error hierarchy with thiserror, plus the refresh report used
//! for graceful degradation when some resources fail to load.

use crate::models::ResourceKey;
use thiserror::Error;

/// Core error type for sellboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Transport Errors
    // ===================
    #[error("Request to {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("Upstream returned HTTP {status} for {path}: {message}")]
    UpstreamStatus {
        path: String,
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// 400 with a `bad-request-*` code: the upstream could not read the
    /// request body, usually because it was serialized twice.
    #[error("Upstream rejected request shape for {path} ({code}): {message}")]
    BadRequestShape {
        path: String,
        code: String,
        message: String,
    },

    // ===================
    // Envelope Errors
    // ===================
    #[error("Request body for {path} is double-serialized")]
    DoubleSerializedBody { path: String },

    #[error("Failed to encode request body: {message}")]
    BodyEncode {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Resource {key} requires a shop id but none is selected")]
    MissingShopId { key: ResourceKey },

    // ===================
    // Session Errors
    // ===================
    #[error("Session cache not initialized")]
    NotInitialized,

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CoreError {
    /// Whether retrying the same request could succeed
    ///
    /// Network failures, throttling (429) and upstream 5xx are retryable.
    /// Any other 4xx is a caller problem and is never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Transport { .. } => true,
            CoreError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Upstream error code, when the upstream supplied one
    pub fn upstream_code(&self) -> Option<&str> {
        match self {
            CoreError::UpstreamStatus { code, .. } => code.as_deref(),
            CoreError::BadRequestShape { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Severity level for errors during a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Non-critical, the dashboard keeps working with partial data
    Warning,
    /// A resource could not be refreshed
    Error,
}

/// Individual error entry in a refresh report
#[derive(Debug, Clone)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for the user (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    /// Create user-friendly error from CoreError with context-aware suggestions
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let suggestion = match error {
            CoreError::Transport { .. } => Some("Check the proxy URL and network connectivity".to_string()),
            CoreError::UpstreamStatus { status: 401 | 403, .. } => {
                Some("Check that the API token is valid for this shop".to_string())
            }
            CoreError::UpstreamStatus { status: 429, .. } => {
                Some("Increase request_delay_ms to slow down paging".to_string())
            }
            CoreError::BadRequestShape { .. } | CoreError::DoubleSerializedBody { .. } => {
                Some("Pass request bodies as a single serialized JSON string".to_string())
            }
            CoreError::MissingShopId { .. } => Some("Select a shop with --shop-id".to_string()),
            _ => None,
        };

        Self {
            source: source.into(),
            message: error.to_string(),
            severity: ErrorSeverity::Error,
            suggestion,
        }
    }
}

/// Report of what happened during a refresh
///
/// Tracks partial failures instead of failing the whole dashboard.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub errors: Vec<LoadError>,
    pub resources_fetched: usize,
    pub records_fetched: usize,
    pub served_from_cache: bool,
}

impl RefreshReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::warning(source, message));
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns only warnings
    pub fn warnings(&self) -> impl Iterator<Item = &LoadError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
    }
}

/// Degraded state indicator for the data store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedState {
    /// Last refresh succeeded
    Healthy,
    /// Last refresh failed; previously loaded stats are still shown
    Stale { reason: String },
    /// Nothing has been loaded yet
    Empty,
}

impl DegradedState {
    pub fn is_healthy(&self) -> bool {
        matches!(self, DegradedState::Healthy)
    }
}
