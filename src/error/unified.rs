//! Error classification and structured error bodies.

use serde::{Deserialize, Serialize};

/// Broad error category for routing retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimit,
    Network,
    Client,
    Server,
    Decode,
    Configuration,
    Unknown,
}

/// Structured error body returned by the API (`{ "error": "..." }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    /// Parse a response body, returning `None` unless it carries a string `error` field.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}
