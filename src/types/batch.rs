//! Batch request types.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::ApiError;
use crate::types::request::RequestOptions;

/// One entry of a batch submitted to
/// [`RequestManager::batch_request`](crate::manager::RequestManager::batch_request).
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub id: Option<String>,
    pub endpoint: String,
    pub options: RequestOptions,
}

impl BatchRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            id: None,
            endpoint: endpoint.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Key of this entry in the result map: the id, or the endpoint when absent.
    pub fn result_key(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.endpoint.clone())
    }
}

/// Settled results of a batch, keyed by id (or endpoint).
pub type BatchResults = HashMap<String, Result<Value, ApiError>>;
