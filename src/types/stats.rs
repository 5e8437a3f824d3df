//! Request manager statistics.

use serde::{Deserialize, Serialize};

/// Snapshot returned by [`RequestManager::stats`](crate::manager::RequestManager::stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStats {
    pub cache_size: usize,
    pub in_flight: usize,
    /// Tracked requests in the last minute, summed across endpoints.
    pub requests_last_minute: usize,
    /// Tracked requests in the last five minutes, summed across endpoints.
    pub requests_last_five_minutes: usize,
    pub burst_count: u32,
    pub cache_hits: u64,
    pub dedup_hits: u64,
    pub network_requests: u64,
}
