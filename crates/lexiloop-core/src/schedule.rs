//! Per-library store of pending long-term reviews.
//!
//! Persisted as a plain ordered JSON array under a per-library key.
//! Missing or corrupt stored JSON is treated as an empty store, never
//! as an error.

use std::collections::HashSet;

use crate::error::DatabaseError;
use crate::storage::KvStore;
use crate::word::{ReviewReason, ScheduledReview};

pub(crate) fn schedule_key(library: &str) -> String {
    format!("ll_schedule_{library}_v1")
}

/// Ordered list of pending [`ScheduledReview`] entries for one library.
#[derive(Debug, Clone, Default)]
pub struct ScheduleStore {
    entries: Vec<ScheduledReview>,
}

impl ScheduleStore {
    /// Load the store for `library`, treating absent/corrupt state as empty.
    pub fn load(store: &impl KvStore, library: &str) -> Self {
        let entries = store
            .get(&schedule_key(library))
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { entries }
    }

    /// Persist the store for `library`.
    pub fn save(&self, store: &impl KvStore, library: &str) -> Result<(), DatabaseError> {
        let raw = serde_json::to_string(&self.entries)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        store.set(&schedule_key(library), &raw)
    }

    pub fn append(&mut self, word_id: impl Into<String>, due_at: i64, reason: ReviewReason) {
        self.entries.push(ScheduledReview {
            word_id: word_id.into(),
            due_at,
            reason,
        });
    }

    /// Entries whose due date has arrived, in store order.
    pub fn due_at(&self, now_ms: i64) -> Vec<ScheduledReview> {
        self.entries
            .iter()
            .filter(|e| e.due_at <= now_ms)
            .cloned()
            .collect()
    }

    /// Drop every entry for `word_id`, any horizon.
    pub fn remove_for_word(&mut self, word_id: &str) {
        self.entries.retain(|e| e.word_id != word_id);
    }

    /// Drop every entry whose word id is in `word_ids`.
    pub fn remove_words(&mut self, word_ids: &HashSet<String>) {
        self.entries.retain(|e| !word_ids.contains(&e.word_id));
    }

    pub fn entries(&self) -> &[ScheduledReview] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
