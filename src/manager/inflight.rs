//! In-flight request table.

use std::collections::HashMap;

use futures::future::{BoxFuture, Shared};
use serde_json::Value;

use crate::error::ApiError;
use crate::util::key::RequestKey;

/// Handle every deduplicated caller awaits; all of them see the same result.
pub(crate) type SharedResult = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

struct InFlightEntry {
    id: u64,
    future: SharedResult,
}

/// At most one entry per key. Entries carry an id so a finishing task only
/// removes its own entry, never one installed after a reset.
#[derive(Default)]
pub(crate) struct InFlightTable {
    entries: HashMap<RequestKey, InFlightEntry>,
    next_id: u64,
}

impl InFlightTable {
    pub(crate) fn get(&self, key: &RequestKey) -> Option<SharedResult> {
        self.entries.get(key).map(|e| e.future.clone())
    }

    /// Reserve the id for the next entry.
    pub(crate) fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn insert(&mut self, key: RequestKey, id: u64, future: SharedResult) {
        self.entries.insert(key, InFlightEntry { id, future });
    }

    /// Remove the entry for `key` if it is still the one registered as `id`.
    pub(crate) fn remove_if(&mut self, key: &RequestKey, id: u64) -> bool {
        if self.entries.get(key).is_some_and(|e| e.id == id) {
            self.entries.remove(key);
            true
        } else {
            false
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Forget every entry. Ids keep increasing.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
