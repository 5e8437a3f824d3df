//! Shared test helpers and a scripted mock transport.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use reqman::config::{ClientConfig, SessionAuth};
use reqman::error::ApiError;
use reqman::manager::RequestManager;
use reqman::transport::{PreparedRequest, RawResponse, Transport};
use reqman::util::retry::RetryPolicy;

pub const BASE_URL: &str = "http://localhost:3000/api";

/// One scripted outcome for a call to the mock.
#[derive(Debug, Clone)]
pub enum Step {
    Json(Value),
    Status(u16, &'static str),
    RateLimited(Option<&'static str>),
    NetworkError,
    Raw(RawResponse),
    /// Panic inside the transport call.
    Panic,
}

impl Step {
    fn into_result(self) -> Result<RawResponse, ApiError> {
        match self {
            Step::Json(value) => Ok(RawResponse::json(&value)),
            Step::Status(status, body) => Ok(RawResponse::new(status, body)),
            Step::RateLimited(retry_after) => {
                let response = RawResponse::new(429, "");
                Ok(match retry_after {
                    Some(v) => response.with_retry_after(v),
                    None => response,
                })
            }
            Step::NetworkError => Err(network_error()),
            Step::Raw(response) => Ok(response),
            Step::Panic => panic!("transport panicked"),
        }
    }
}

/// A `reqwest`-originated error, standing in for a dropped connection.
pub fn network_error() -> ApiError {
    reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err()
        .into()
}

#[derive(Default)]
struct Route {
    script: VecDeque<Step>,
    fallback: Option<Step>,
}

/// A transport that answers from per-path scripts.
///
/// Each path plays its queued steps in order, then repeats its fallback.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: AtomicUsize,
    calls_by_path: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<PreparedRequest>>,
    latency: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call (keeps requests in flight).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue steps for `path`, played once each.
    pub fn script(self, path: &str, steps: Vec<Step>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .script
            .extend(steps);
        self
    }

    /// Step repeated for `path` once its script runs out.
    pub fn always(self, path: &str, step: Step) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .fallback = Some(step);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls_by_path
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        *self
            .calls_by_path
            .lock()
            .unwrap()
            .entry(path.clone())
            .or_default() += 1;

        let step = {
            let mut routes = self.routes.lock().unwrap();
            let route = routes
                .get_mut(&path)
                .unwrap_or_else(|| panic!("no route scripted for {path}"));
            route
                .script
                .pop_front()
                .or_else(|| route.fallback.clone())
                .unwrap_or_else(|| panic!("script for {path} exhausted"))
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        step.into_result()
    }
}

/// Config resolving relative endpoints against [`BASE_URL`], default retries.
pub fn test_config() -> ClientConfig {
    ClientConfig::new().with_host("localhost")
}

/// Config with a retry policy that never waits long.
pub fn fast_retry_config(max_retries: u32) -> ClientConfig {
    test_config().with_retry(RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
        rate_limit_unit: Duration::from_millis(1),
        ..Default::default()
    })
}

pub fn manager_with(config: ClientConfig, transport: Arc<MockTransport>) -> RequestManager {
    RequestManager::new(config, SessionAuth::new(), transport)
}
