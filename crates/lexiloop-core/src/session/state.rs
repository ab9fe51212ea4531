//! Persisted session state.
//!
//! One blob per library, plus one global blob holding the currently
//! selected library. Field names are the wire shape; anything that
//! fails to parse is treated as absent and the session starts fresh.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::storage::KvStore;
use crate::word::{SeenLog, Stage, Word};

pub(crate) const GLOBAL_KEY: &str = "ll_global_v1";

pub(crate) fn state_key(library: &str) -> String {
    format!("ll_state_{library}_v1")
}

pub(crate) fn new_session_id() -> String {
    format!("s_{}", Uuid::new_v4().simple())
}

/// The engine's root aggregate, serialized as a single JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    pub session_id: String,
    pub current_library: String,
    /// Long-term reviews that came due; head = next to serve.
    pub due_now: VecDeque<Word>,
    /// Intra-session reinforcement queue; preempts everything else.
    pub review_queue: VecDeque<Word>,
    /// Unseen material, seeded from the full catalog.
    pub new_queue: VecDeque<Word>,
    /// Word ids already presented, in order.
    pub history: Vec<String>,
    /// Cursor into `history`; -1 = empty.
    pub hist_pos: i64,
    pub visible_elapsed_sec: u64,
    pub last_processed_block: u64,
    pub thirty_triggered: bool,
    pub seen: Vec<SeenLog>,
    pub review_passes: HashMap<String, u32>,
    pub word_stage: HashMap<String, Stage>,
    pub skipped_ids: BTreeSet<String>,
    pub completed2d_count: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            current_library: String::new(),
            due_now: VecDeque::new(),
            review_queue: VecDeque::new(),
            new_queue: VecDeque::new(),
            history: Vec::new(),
            hist_pos: -1,
            visible_elapsed_sec: 0,
            last_processed_block: 0,
            thirty_triggered: false,
            seen: Vec::new(),
            review_passes: HashMap::new(),
            word_stage: HashMap::new(),
            skipped_ids: BTreeSet::new(),
            completed2d_count: 0,
        }
    }
}

impl SessionState {
    /// Fresh state for `library`: the whole catalog queued as new.
    pub fn fresh(library: &str, words: &[Word]) -> Self {
        Self {
            session_id: new_session_id(),
            current_library: library.to_string(),
            new_queue: words.iter().cloned().collect(),
            ..Self::default()
        }
    }

    /// Restore the blob for `library`. Missing or corrupt state is
    /// absence, never an error.
    pub(crate) fn load(store: &impl KvStore, library: &str) -> Option<Self> {
        let raw = store.get(&state_key(library)).ok().flatten()?;
        let state: Self = serde_json::from_str(&raw).ok()?;
        Some(state.sanitized(library))
    }

    /// Clamp restored fields into their invariants.
    fn sanitized(mut self, library: &str) -> Self {
        if self.session_id.is_empty() {
            self.session_id = new_session_id();
        }
        self.current_library = library.to_string();
        let max = self.history.len() as i64 - 1;
        self.hist_pos = self.hist_pos.clamp(-1, max);
        self
    }

    pub fn queues_empty(&self) -> bool {
        self.due_now.is_empty() && self.review_queue.is_empty() && self.new_queue.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.due_now.len() + self.review_queue.len() + self.new_queue.len()
    }
}

/// Read the global "currently selected library" pointer.
pub(crate) fn load_global_library(store: &impl KvStore) -> Option<String> {
    let raw = store.get(GLOBAL_KEY).ok().flatten()?;
    let obj: serde_json::Value = serde_json::from_str(&raw).ok()?;
    obj.get("currentLibrary")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Merge the library pointer into the global blob, preserving any
/// other keys a future build may add there.
pub(crate) fn save_global_library(
    store: &impl KvStore,
    library: &str,
) -> Result<(), DatabaseError> {
    let mut obj = store
        .get(GLOBAL_KEY)
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
        .filter(serde_json::Value::is_object)
        .unwrap_or_else(|| serde_json::json!({}));
    obj["currentLibrary"] = serde_json::Value::String(library.to_string());
    store.set(GLOBAL_KEY, &obj.to_string())
}
