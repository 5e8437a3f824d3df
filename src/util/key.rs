//! Dedup/cache key derivation.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{FormPart, HttpMethod, RequestBody};

/// Identifies one logical request for deduplication and caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    value: String,
    endpoint_start: usize,
    endpoint_end: usize,
}

impl RequestKey {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Endpoint segment of the key, as passed by the caller.
    pub fn endpoint(&self) -> &str {
        &self.value[self.endpoint_start..self.endpoint_end]
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// How JSON bodies contribute to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Keep the first `max_body_chars` characters of the serialized body.
    /// Large bodies sharing a prefix collide.
    Truncated { max_body_chars: usize },
    /// Digest of the full serialized body.
    Hashed,
}

impl Default for KeyStrategy {
    fn default() -> Self {
        Self::Truncated {
            max_body_chars: 100,
        }
    }
}

/// Build the key for `method endpoint` with an optional body.
pub fn build_key(
    endpoint: &str,
    method: HttpMethod,
    body: Option<&RequestBody>,
    strategy: KeyStrategy,
) -> RequestKey {
    let fragment = match body {
        None => String::new(),
        Some(RequestBody::Json(value)) => {
            let serialized = value.to_string();
            match strategy {
                KeyStrategy::Truncated { max_body_chars } => {
                    truncate_chars(&serialized, max_body_chars).to_string()
                }
                KeyStrategy::Hashed => digest(serialized.as_bytes()),
            }
        }
        Some(RequestBody::Bytes { data, .. }) => digest(data),
        Some(RequestBody::Multipart(form)) => {
            let mut hasher = Sha256::new();
            for part in &form.parts {
                match part {
                    FormPart::Text { name, value } => {
                        hasher.update(name.as_bytes());
                        hasher.update([0u8]);
                        hasher.update(value.as_bytes());
                    }
                    FormPart::File {
                        name,
                        file_name,
                        data,
                        ..
                    } => {
                        hasher.update(name.as_bytes());
                        hasher.update([0u8]);
                        hasher.update(file_name.as_bytes());
                        hasher.update([0u8]);
                        hasher.update(data);
                    }
                }
                hasher.update([0xffu8]);
            }
            format!("sha256:{}", URL_SAFE_NO_PAD.encode(hasher.finalize()))
        }
    };

    let method = method.to_string();
    let endpoint_start = method.len() + 1;
    RequestKey {
        value: format!("{method}:{endpoint}:{fragment}"),
        endpoint_start,
        endpoint_end: endpoint_start + endpoint.len(),
    }
}

fn digest(bytes: &[u8]) -> String {
    format!("sha256:{}", URL_SAFE_NO_PAD.encode(Sha256::digest(bytes)))
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
