//! Configuration system (layered: code > env > config file > defaults).

pub mod auth;

pub use auth::SessionAuth;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::util::frequency::FrequencyConfig;
use crate::util::key::KeyStrategy;
use crate::util::retry::{duration_ms, RetryPolicy};

pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_REMOTE_BASE_URL: &str = "https://api.example.com/api";

const LOCAL_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "::1"];

const CONFIG_FILE_NAME: &str = "reqman.toml";

/// Runtime configuration for a [`RequestManager`](crate::manager::RequestManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host of the calling context; decides between the local and remote base.
    pub host: String,
    pub local_base_url: String,
    pub remote_base_url: String,
    pub retry: RetryPolicy,
    #[serde(with = "duration_ms")]
    pub cache_ttl: Duration,
    pub cache_sweep_threshold: usize,
    pub burst_threshold: u32,
    #[serde(with = "duration_ms")]
    pub burst_window: Duration,
    #[serde(with = "duration_ms")]
    pub frequency_horizon: Duration,
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    pub key_strategy: KeyStrategy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let frequency = FrequencyConfig::default();
        Self {
            host: "localhost".to_string(),
            local_base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            remote_base_url: DEFAULT_REMOTE_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            cache_ttl: Duration::from_secs(30),
            cache_sweep_threshold: crate::util::cache::DEFAULT_SWEEP_THRESHOLD,
            burst_threshold: frequency.burst_threshold,
            burst_window: frequency.burst_window,
            frequency_horizon: frequency.horizon,
            request_timeout: Duration::from_secs(30),
            key_strategy: KeyStrategy::default(),
        }
    }
}

/// Whether `host` (optionally with a `:port`) is a local-development host.
pub fn is_local_host(host: &str) -> bool {
    let host = host.trim().to_ascii_lowercase();
    let bare = if let Some(inner) = host.strip_prefix('[') {
        // [::1] or [::1]:3000
        inner.split(']').next().unwrap_or(inner)
    } else if host.matches(':').count() == 1 {
        host.split(':').next().unwrap_or(&host)
    } else {
        host.as_str()
    };
    LOCAL_HOSTS.contains(&bare)
}

/// Pick the base URL for `host`.
pub fn resolve_base_url<'a>(host: &str, local: &'a str, remote: &'a str) -> &'a str {
    if is_local_host(host) {
        local
    } else {
        remote
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the calling context's host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Point both bases at one URL (handy for tests and single-backend setups).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.local_base_url = url.clone();
        self.remote_base_url = url;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    /// Base URL selected for the configured host.
    pub fn base_url(&self) -> &str {
        resolve_base_url(&self.host, &self.local_base_url, &self.remote_base_url)
    }

    /// Resolve an endpoint against the base URL. Absolute URLs pass through.
    pub fn resolve_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        let base = self.base_url().trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        format!("{base}/{path}")
    }

    pub fn frequency(&self) -> FrequencyConfig {
        FrequencyConfig {
            horizon: self.frequency_horizon,
            burst_window: self.burst_window,
            burst_threshold: self.burst_threshold,
        }
    }

    /// Parse a TOML config document. Missing fields keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ApiError> {
        toml::from_str(source)
            .map_err(|e| ApiError::Configuration(format!("Invalid config file: {e}")))
    }

    /// Load a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ApiError::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Default config file path (`<config dir>/reqman/reqman.toml`).
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "reqman")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load defaults, then the default config file if present, then env overrides.
    pub fn load() -> Result<Self, ApiError> {
        let base = match Self::default_config_path() {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// Defaults plus environment variables (`.env` is loaded if present).
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `REQMAN_*` environment variables on top of this config.
    pub fn with_env_overrides(mut self) -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        if let Ok(host) = std::env::var("REQMAN_HOST") {
            self.host = host;
        }
        if let Ok(url) = std::env::var("REQMAN_LOCAL_BASE_URL") {
            self.local_base_url = url;
        }
        if let Ok(url) = std::env::var("REQMAN_REMOTE_BASE_URL") {
            self.remote_base_url = url;
        }
        if let Some(n) = env_number::<u32>("REQMAN_MAX_RETRIES") {
            self.retry.max_retries = n;
        }
        if let Some(ms) = env_number::<u64>("REQMAN_BASE_DELAY_MS") {
            self.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_number::<u64>("REQMAN_CACHE_TTL_MS") {
            self.cache_ttl = Duration::from_millis(ms);
        }
        if let Some(secs) = env_number::<u64>("REQMAN_TIMEOUT_SECS") {
            self.request_timeout = Duration::from_secs(secs);
        }
        self
    }
}

fn env_number<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}
