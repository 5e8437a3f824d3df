//! Reqman: a deduplicating, caching, retrying API request manager.
//!
//! Sits in front of an HTTP client and provides:
//! - in-flight request coalescing keyed by method, endpoint and body,
//! - a TTL response cache with size-triggered sweeping,
//! - bounded retries with exponential backoff that honor `Retry-After` on 429,
//! - per-endpoint and burst request-frequency diagnostics,
//! - all-settled batch requests.
//!
//! # Quick Start
//!
//! ```no_run
//! use reqman::prelude::*;
//!
//! # async fn example() -> reqman::error::Result<()> {
//! let config = ClientConfig::from_env().with_host("localhost:3000");
//! let manager = RequestManager::with_http(config, SessionAuth::new())?;
//!
//! // Concurrent identical calls share one network request.
//! let (a, b) = tokio::join!(manager.get("/users/42"), manager.get("/users/42"));
//! assert_eq!(a?, b?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod prelude;
pub mod transport;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
