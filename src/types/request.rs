//! Request options and bodies.

use bon::Builder;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{Display, EnumString};

/// HTTP method of a managed request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Whether this method changes server state (and therefore needs a CSRF token).
    pub fn is_state_changing(self) -> bool {
        self != Self::Get
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        data: Vec<u8>,
    },
}

/// A multipart form that can be rebuilt for every retry attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<String>,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime,
            data,
        });
        self
    }
}

/// Body of a managed request.
///
/// Only `Json` is serialized and given a JSON content type; the other
/// variants are sent as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(MultipartForm),
    Bytes {
        content_type: Option<String>,
        data: Vec<u8>,
    },
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<MultipartForm> for RequestBody {
    fn from(form: MultipartForm) -> Self {
        Self::Multipart(form)
    }
}

/// Per-call options for [`RequestManager::request`](crate::manager::RequestManager::request).
#[derive(Debug, Clone, Default, Builder)]
pub struct RequestOptions {
    #[builder(default)]
    pub method: HttpMethod,
    #[builder(default)]
    pub headers: HeaderMap,
    #[builder(into)]
    pub body: Option<RequestBody>,
    /// Skip the cache lookup; the result is still stored afterwards.
    #[builder(default)]
    pub bypass_cache: bool,
    /// TTL override for this call's cache entry.
    pub cache_ttl: Option<Duration>,
    /// Do not inject `Content-Type: application/json`.
    #[builder(default)]
    pub skip_content_type: bool,
    /// Never store this call's result in the cache.
    #[builder(default)]
    pub no_store: bool,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn with_method(method: HttpMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// JSON body request with the given method.
    pub fn json(method: HttpMethod, body: serde_json::Value) -> Self {
        Self {
            method,
            body: Some(RequestBody::Json(body)),
            ..Default::default()
        }
    }
}
