//! Error types for reqman.

pub mod unified;

pub use unified::{ErrorBody, ErrorCategory};

use std::sync::Arc;

use thiserror::Error;

/// Primary error type for all request manager operations.
///
/// Cloneable so a single in-flight result can be handed to every
/// deduplicated caller; non-cloneable sources are kept behind `Arc`.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    #[error("HTTP 429: rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(Arc::new(err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(Arc::new(err))
    }
}

impl ApiError {
    /// Create an API error for a non-2xx status.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an API error from a status and the raw response body.
    ///
    /// Uses the structured `{ "error": "..." }` message when the body has one,
    /// otherwise synthesizes `HTTP <status>`.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = ErrorBody::parse(body)
            .map(|b| b.error)
            .unwrap_or_else(|| format!("HTTP {status}"));
        Self::api(status, message)
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) => ErrorCategory::Network,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Api { status, .. } => match status {
                429 => ErrorCategory::RateLimit,
                400..=499 => ErrorCategory::Client,
                // Unfollowed 3xx and other stray statuses back off like 5xx.
                _ => ErrorCategory::Server,
            },
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether the retry executor may try again after this error.
    ///
    /// Client errors are retryable here; `RetryPolicy::retry_client_errors`
    /// decides whether the executor actually does.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Configuration | ErrorCategory::Unknown
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ApiError>;
