//! The network seam: a `Transport` sends one prepared request and reports
//! the raw response; classification into values and errors happens here.

pub mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{HttpMethod, RequestBody};

/// A fully resolved request, ready for the wire.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

/// Status, the headers the manager cares about, and the body bytes.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub cache_control: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Default::default()
        }
    }

    /// A 200 response with a JSON body.
    pub fn json(value: &Value) -> Self {
        Self::new(200, value.to_string())
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }

    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the server asked for this response not to be stored.
    pub fn is_no_store(&self) -> bool {
        self.cache_control.as_deref().is_some_and(|cc| {
            cc.split(',')
                .any(|directive| directive.trim().eq_ignore_ascii_case("no-store"))
        })
    }
}

/// Sends prepared requests. Errors are reserved for connection-level
/// failures; every HTTP status comes back as a [`RawResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, ApiError>;
}

/// Turn a raw response into the decoded JSON body or a typed error.
pub fn classify_response(response: &RawResponse) -> Result<Value, ApiError> {
    if response.is_success() {
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_slice(&response.body)?);
    }

    if response.status == 429 {
        return Err(ApiError::RateLimited {
            retry_after_secs: response
                .retry_after
                .as_deref()
                .and_then(|v| v.trim().parse().ok()),
        });
    }

    Err(ApiError::from_status(response.status, &response.body))
}
