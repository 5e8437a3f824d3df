//! Request frequency tracking and burst diagnostics.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

/// Window settings for [`FrequencyTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyConfig {
    /// How long per-endpoint timestamps are kept.
    pub horizon: Duration,
    /// Length of the global burst window.
    pub burst_window: Duration,
    /// Burst count above which a warning is logged.
    pub burst_threshold: u32,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            horizon: Duration::from_secs(10 * 60),
            burst_window: Duration::from_secs(60),
            burst_threshold: 20,
        }
    }
}

/// Records request timestamps per endpoint plus a coarse global burst counter.
///
/// Purely observational: nothing here delays or rejects a request.
#[derive(Debug)]
pub struct FrequencyTracker {
    config: FrequencyConfig,
    per_endpoint: HashMap<String, VecDeque<Instant>>,
    burst: BurstCounter,
}

#[derive(Debug)]
struct BurstCounter {
    count: u32,
    window_start: Instant,
}

impl FrequencyTracker {
    pub fn new(config: FrequencyConfig) -> Self {
        Self {
            config,
            per_endpoint: HashMap::new(),
            burst: BurstCounter {
                count: 0,
                window_start: Instant::now(),
            },
        }
    }

    /// Record a request to `endpoint`. Returns `true` when the burst
    /// threshold is exceeded.
    pub fn track(&mut self, endpoint: &str) -> bool {
        let now = Instant::now();
        let horizon = self.config.horizon;

        let stamps = self.per_endpoint.entry(endpoint.to_string()).or_default();
        stamps.push_back(now);
        while stamps
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) > horizon)
        {
            stamps.pop_front();
        }

        if now.saturating_duration_since(self.burst.window_start) > self.config.burst_window {
            self.burst.count = 0;
            self.burst.window_start = now;
        }
        self.burst.count += 1;

        let bursting = self.burst.count > self.config.burst_threshold;
        if bursting {
            tracing::warn!(
                endpoint,
                burst_count = self.burst.count,
                threshold = self.config.burst_threshold,
                "High request frequency"
            );
        }
        bursting
    }

    /// Requests recorded within `window` of now, summed across endpoints.
    pub fn requests_within(&self, window: Duration) -> usize {
        let now = Instant::now();
        self.per_endpoint
            .values()
            .map(|stamps| {
                stamps
                    .iter()
                    .rev()
                    .take_while(|t| now.saturating_duration_since(**t) < window)
                    .count()
            })
            .sum()
    }

    /// Requests recorded for one endpoint within the horizon.
    pub fn endpoint_count(&self, endpoint: &str) -> usize {
        self.per_endpoint.get(endpoint).map_or(0, VecDeque::len)
    }

    pub fn burst_count(&self) -> u32 {
        self.burst.count
    }

    /// Reset all tracking.
    pub fn clear(&mut self) {
        self.per_endpoint.clear();
        self.burst.count = 0;
        self.burst.window_start = Instant::now();
    }
}
