//! Engine pieces: key building, TTL cache, retry executor, frequency tracking.

pub mod cache;
pub mod frequency;
pub mod key;
pub mod retry;
