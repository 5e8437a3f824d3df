//! Request manager: deduplication, caching, retry and frequency tracking in
//! front of a [`Transport`].
//!
//! ```no_run
//! use reqman::prelude::*;
//!
//! # async fn example() -> reqman::error::Result<()> {
//! let manager = RequestManager::from_env()?;
//! let user = manager.get("/users/42").await?;
//! println!("{user}");
//! println!("{:?}", manager.stats());
//! # Ok(())
//! # }
//! ```

mod inflight;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{ClientConfig, SessionAuth};
use crate::error::{ApiError, Result};
use crate::transport::http::build_headers;
use crate::transport::{classify_response, HttpTransport, PreparedRequest, Transport};
use crate::types::{BatchRequest, BatchResults, HttpMethod, RequestOptions, RequestStats};
use crate::util::cache::TtlCache;
use crate::util::frequency::FrequencyTracker;
use crate::util::key::{build_key, RequestKey};

use inflight::{InFlightTable, SharedResult};

/// Deduplicating, caching, retrying front for API requests.
///
/// Cheap to clone; clones share one cache, in-flight table and frequency
/// tracker. Construct once and hand clones to callers.
#[derive(Clone)]
pub struct RequestManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    auth: SessionAuth,
    transport: Arc<dyn Transport>,
    state: Mutex<State>,
}

struct State {
    cache: TtlCache<RequestKey, Value>,
    in_flight: InFlightTable,
    frequency: FrequencyTracker,
    /// Bumped by `reset`; tasks started under an older generation do not cache.
    generation: u64,
    cache_hits: u64,
    dedup_hits: u64,
    network_requests: u64,
}

impl std::fmt::Debug for RequestManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestManager")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl RequestManager {
    pub fn new(config: ClientConfig, auth: SessionAuth, transport: Arc<dyn Transport>) -> Self {
        let state = State {
            cache: TtlCache::new(config.cache_ttl, config.cache_sweep_threshold),
            in_flight: InFlightTable::default(),
            frequency: FrequencyTracker::new(config.frequency()),
            generation: 0,
            cache_hits: 0,
            dedup_hits: 0,
            network_requests: 0,
        };
        Self {
            inner: Arc::new(Inner {
                config,
                auth,
                transport,
                state: Mutex::new(state),
            }),
        }
    }

    /// Manager over a cookie-enabled HTTP client sharing `auth`'s jar.
    pub fn with_http(config: ClientConfig, auth: SessionAuth) -> Result<Self> {
        let transport = HttpTransport::new(&auth, config.request_timeout)?;
        Ok(Self::new(config, auth, Arc::new(transport)))
    }

    /// Manager configured from the config file and `REQMAN_*` environment.
    pub fn from_env() -> Result<Self> {
        Self::with_http(ClientConfig::load()?, SessionAuth::new())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn auth(&self) -> &SessionAuth {
        &self.inner.auth
    }

    /// Issue a request, joining an identical in-flight one or serving a
    /// fresh cached value when possible.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        let key = self.key_for(endpoint, &options);

        let future = {
            let mut state = self.inner.lock();

            if let Some(existing) = state.in_flight.get(&key) {
                state.dedup_hits += 1;
                tracing::debug!(key = %key, "Joining in-flight request");
                existing
            } else {
                if !options.bypass_cache {
                    if let Some(value) = state.cache.get(&key) {
                        state.cache_hits += 1;
                        tracing::debug!(key = %key, "Cache hit");
                        return Ok(value);
                    }
                }

                state.frequency.track(endpoint);
                state.network_requests += 1;
                self.start(&mut state, key, endpoint, options)
            }
        };

        future.await
    }

    /// Spawn the network work for `key` and register it as in flight.
    ///
    /// Runs under the state lock, so the lookup in `request` and this insert
    /// form one insert-if-absent step.
    fn start(
        &self,
        state: &mut State,
        key: RequestKey,
        endpoint: &str,
        options: RequestOptions,
    ) -> SharedResult {
        let id = state.in_flight.next_id();
        let generation = state.generation;
        let inner = self.inner.clone();
        let task_key = key.clone();
        let endpoint = endpoint.to_string();

        let handle = tokio::spawn(async move {
            let _guard = InFlightGuard {
                inner: inner.clone(),
                key: task_key.clone(),
                id,
            };
            inner
                .execute(task_key, id, generation, &endpoint, &options)
                .await
        });

        let future = async move {
            handle.await.unwrap_or_else(|e| {
                Err(ApiError::InvalidState(format!("Request task failed: {e}")))
            })
        }
        .boxed()
        .shared();

        state.in_flight.insert(key, id, future.clone());
        future
    }

    /// Issue a request and decode the JSON body into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let value = self.request(endpoint, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        self.request(endpoint, RequestOptions::get()).await
    }

    pub async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        self.request(endpoint, RequestOptions::json(HttpMethod::Post, body))
            .await
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> Result<Value> {
        self.request(endpoint, RequestOptions::json(HttpMethod::Put, body))
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.request(endpoint, RequestOptions::with_method(HttpMethod::Delete))
            .await
    }

    /// Run a set of requests, settling every one of them.
    ///
    /// Cached entries are answered immediately; the rest run concurrently.
    /// Failures are captured in the map instead of aborting the batch.
    pub async fn batch_request(&self, requests: Vec<BatchRequest>) -> BatchResults {
        let mut results = BatchResults::with_capacity(requests.len());
        let mut pending = Vec::new();

        {
            let mut state = self.inner.lock();
            for request in requests {
                if !request.options.bypass_cache {
                    let key = self.key_for(&request.endpoint, &request.options);
                    if let Some(value) = state.cache.get(&key) {
                        state.cache_hits += 1;
                        results.insert(request.result_key(), Ok(value));
                        continue;
                    }
                }
                pending.push(request);
            }
        }

        if pending.is_empty() {
            tracing::debug!(count = results.len(), "Batch served entirely from cache");
            return results;
        }

        let settled = join_all(pending.into_iter().map(|request| async move {
            let id = request.result_key();
            let result = self.request(&request.endpoint, request.options).await;
            (id, result)
        }))
        .await;

        results.extend(settled);
        results
    }

    /// Snapshot of cache, in-flight and frequency state.
    pub fn stats(&self) -> RequestStats {
        let state = self.inner.lock();
        RequestStats {
            cache_size: state.cache.len(),
            in_flight: state.in_flight.len(),
            requests_last_minute: state.frequency.requests_within(Duration::from_secs(60)),
            requests_last_five_minutes: state
                .frequency
                .requests_within(Duration::from_secs(5 * 60)),
            burst_count: state.frequency.burst_count(),
            cache_hits: state.cache_hits,
            dedup_hits: state.dedup_hits,
            network_requests: state.network_requests,
        }
    }

    /// Clear the cache, the in-flight table and all counters in one step.
    ///
    /// Requests still running finish for their existing callers but do not
    /// write into the cleared cache.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.cache.clear();
        state.in_flight.clear();
        state.frequency.clear();
        state.generation += 1;
        state.cache_hits = 0;
        state.dedup_hits = 0;
        state.network_requests = 0;
        tracing::debug!(generation = state.generation, "Request manager reset");
    }

    /// Drop cached entries whose endpoint starts with `prefix`.
    pub fn invalidate(&self, prefix: &str) -> usize {
        self.inner
            .lock()
            .cache
            .invalidate_where(|key| key.endpoint().starts_with(prefix))
    }

    fn key_for(&self, endpoint: &str, options: &RequestOptions) -> RequestKey {
        build_key(
            endpoint,
            options.method,
            options.body.as_ref(),
            self.inner.config.key_strategy,
        )
    }
}

/// Removes a task's in-flight entry however the task ends, including a
/// panic inside the transport.
struct InFlightGuard {
    inner: Arc<Inner>,
    key: RequestKey,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.lock().in_flight.remove_if(&self.key, self.id) {
            tracing::warn!(key = %self.key, "Request task ended without settling");
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Body of the spawned task: fetch with retry, then settle bookkeeping.
    async fn execute(
        &self,
        key: RequestKey,
        id: u64,
        generation: u64,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<Value> {
        let result = self.fetch(endpoint, options).await;

        let mut state = self.lock();
        state.in_flight.remove_if(&key, id);

        match result {
            Ok((value, no_store)) => {
                if !no_store && !options.no_store && generation == state.generation {
                    match options.cache_ttl {
                        Some(ttl) => state.cache.set_with_ttl(key, value.clone(), ttl),
                        None => state.cache.set(key, value.clone()),
                    }
                }
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }

    /// Send through the retry executor. Returns the value and whether the
    /// server marked it `no-store`.
    async fn fetch(&self, endpoint: &str, options: &RequestOptions) -> Result<(Value, bool)> {
        let url = self.config.resolve_url(endpoint);
        let headers = build_headers(options, &url, &self.auth)?;
        let request = PreparedRequest {
            method: options.method,
            url,
            headers,
            body: options.body.clone(),
        };

        let request = &request;
        let transport = &self.transport;
        self.config
            .retry
            .execute(move || async move {
                let response = transport.send(request).await?;
                let value = classify_response(&response)?;
                Ok((value, response.is_no_store()))
            })
            .await
    }
}
