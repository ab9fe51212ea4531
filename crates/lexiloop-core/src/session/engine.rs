//! Session engine implementation.
//!
//! The engine is a caller-driven state machine. It owns no timer and
//! no threads -- the host calls `tick()` once per *visible* second and
//! the user-facing operations (`next`, `prev`, `skip_current`, library
//! switches) synchronously between ticks. Because no queue-mutating
//! method suspends, tick-driven and user-driven mutation can never
//! interleave mid-update.
//!
//! ## Queue priority
//!
//! ```text
//! review_queue > due_now > new_queue
//! ```
//!
//! Review and due-catch-up always preempt new material. Time-based
//! reinforcement re-queues recently seen words once per elapsed block,
//! and a one-shot full review fires when the total-session threshold
//! is reached; once it has fired and all queues drain, the session is
//! finalized and every seen word is scheduled for 2-day and 7-day
//! recall.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::state::{self, SessionState};
use crate::catalog::CatalogLoader;
use crate::clock;
use crate::error::Result;
use crate::schedule::ScheduleStore;
use crate::storage::KvStore;
use crate::word::{Mode, ReviewReason, SeenLog, Stage, Word};

const DEFAULT_BLOCK_SIZE_SEC: u64 = 300;
const DEFAULT_TOTAL_SESSION_SEC: u64 = 1800;

/// Aggregate per-stage word counts for the current catalog.
///
/// Words outside the catalog or in the skipped set are excluded from
/// every bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub new: usize,
    pub seen: usize,
    pub block: usize,
    pub session: usize,
    pub due2d: usize,
}

/// Read-only view of the engine for display, serialized as JSON by
/// the CLI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub library: String,
    pub visible_elapsed_sec: u64,
    pub due_count: usize,
    pub review_count: usize,
    pub new_count: usize,
    pub ui_index: usize,
    pub ui_total: usize,
    pub total_words: usize,
    pub completed2d_count: u32,
    pub current: Option<Word>,
}

/// Core session engine.
///
/// Constructed with injected persistence and catalog collaborators;
/// one instance per active library selection.
pub struct SessionEngine<S: KvStore, L: CatalogLoader> {
    store: S,
    loader: L,
    block_size_sec: u64,
    total_session_sec: u64,
    /// Immutable catalog for the current library. Queues hold copies;
    /// history resolution always goes through this lookup.
    base_words: Vec<Word>,
    by_id: HashMap<String, usize>,
    scheduled: ScheduleStore,
    mode: Mode,
    /// Session already finalized; guards against re-scheduling when
    /// the queues are observed empty again.
    finished: bool,
    state: SessionState,
}

impl<S: KvStore, L: CatalogLoader> SessionEngine<S, L> {
    /// Create an engine for `library`. Call [`initialize`] before
    /// serving words.
    ///
    /// [`initialize`]: SessionEngine::initialize
    pub fn new(store: S, loader: L, library: impl Into<String>) -> Self {
        let st = SessionState {
            current_library: library.into(),
            ..SessionState::default()
        };
        Self {
            store,
            loader,
            block_size_sec: DEFAULT_BLOCK_SIZE_SEC,
            total_session_sec: DEFAULT_TOTAL_SESSION_SEC,
            base_words: Vec::new(),
            by_id: HashMap::new(),
            scheduled: ScheduleStore::default(),
            mode: Mode::New,
            finished: false,
            state: st,
        }
    }

    /// Override the block window and total-session threshold (seconds).
    pub fn with_durations(mut self, block_size_sec: u64, total_session_sec: u64) -> Self {
        self.block_size_sec = block_size_sec.max(1);
        self.total_session_sec = total_session_sec;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn library(&self) -> &str {
        &self.state.current_library
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn visible_elapsed_sec(&self) -> u64 {
        self.state.visible_elapsed_sec
    }

    /// Words remaining across all three queues.
    pub fn total_count(&self) -> usize {
        self.state.total_count()
    }

    /// Catalog size.
    pub fn total_words(&self) -> usize {
        self.base_words.len()
    }

    /// 1-based position of the cursor for display; 0 when empty.
    pub fn ui_index(&self) -> usize {
        if self.state.hist_pos >= 0 {
            self.state.hist_pos as usize + 1
        } else {
            0
        }
    }

    pub fn ui_total(&self) -> usize {
        self.state.history.len().max(self.total_count())
    }

    pub fn completed_two_day_count(&self) -> u32 {
        self.state.completed2d_count
    }

    pub fn review_passes_for(&self, id: &str) -> u32 {
        self.state.review_passes.get(id).copied().unwrap_or(0)
    }

    pub fn schedule_store(&self) -> &ScheduleStore {
        &self.scheduled
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn word(&self, id: &str) -> Option<&Word> {
        self.by_id.get(id).map(|&i| &self.base_words[i])
    }

    /// Ids currently resident in any of the three queues. Every
    /// re-queue path must check against all of them, or a word ends up
    /// in two queues at once.
    fn queued_ids(&self) -> HashSet<String> {
        self.state
            .due_now
            .iter()
            .chain(self.state.review_queue.iter())
            .chain(self.state.new_queue.iter())
            .map(|w| w.id.clone())
            .collect()
    }

    fn current_history_id(&self) -> Option<&str> {
        usize::try_from(self.state.hist_pos)
            .ok()
            .and_then(|i| self.state.history.get(i))
            .map(String::as_str)
    }

    /// The word at the history cursor, resolved against the immutable
    /// catalog; queue heads (in priority order) when history is empty.
    pub fn current_word(&self) -> Option<&Word> {
        if let Some(w) = self.current_history_id().and_then(|id| self.word(id)) {
            return Some(w);
        }
        self.state
            .review_queue
            .front()
            .or_else(|| self.state.due_now.front())
            .or_else(|| self.state.new_queue.front())
    }

    /// Head of the priority queues without consuming. Updates `mode`
    /// for display; `Done` when all three queues are empty.
    pub fn peek_next(&mut self) -> Option<&Word> {
        if !self.state.review_queue.is_empty() {
            self.mode = Mode::Review;
            return self.state.review_queue.front();
        }
        if !self.state.due_now.is_empty() {
            self.mode = Mode::Due;
            return self.state.due_now.front();
        }
        if !self.state.new_queue.is_empty() {
            self.mode = Mode::New;
            return self.state.new_queue.front();
        }
        self.mode = Mode::Done;
        None
    }

    /// Up to `n` upcoming words for speech pre-caching. Unconsumed
    /// forward-history entries first, then the head of the first
    /// non-empty queue in priority order. Never mutates state.
    pub fn upcoming_words(&self, n: usize) -> Vec<&Word> {
        let mut out: Vec<&Word> = Vec::new();
        let next = (self.state.hist_pos + 1).max(0) as usize;
        for id in self.state.history.iter().skip(next) {
            if out.len() >= n {
                return out;
            }
            if let Some(w) = self.word(id) {
                out.push(w);
            }
        }
        let queue = if !self.state.review_queue.is_empty() {
            &self.state.review_queue
        } else if !self.state.due_now.is_empty() {
            &self.state.due_now
        } else {
            &self.state.new_queue
        };
        for w in queue.iter() {
            if out.len() >= n {
                break;
            }
            out.push(w);
        }
        out
    }

    pub fn stage(&self, id: &str) -> Stage {
        self.state.word_stage.get(id).copied().unwrap_or(Stage::New)
    }

    pub fn stage_counts(&self) -> StageCounts {
        let mut counts = StageCounts::default();
        for (id, stage) in &self.state.word_stage {
            if !self.by_id.contains_key(id) || self.state.skipped_ids.contains(id) {
                continue;
            }
            match stage {
                Stage::New => {}
                Stage::Seen => counts.seen += 1,
                Stage::Block => counts.block += 1,
                Stage::Session => counts.session += 1,
                Stage::Due2d => counts.due2d += 1,
            }
        }
        let skipped = self
            .state
            .skipped_ids
            .iter()
            .filter(|id| self.by_id.contains_key(id.as_str()))
            .count();
        let non_new = counts.seen + counts.block + counts.session + counts.due2d;
        counts.new = self.base_words.len().saturating_sub(non_new + skipped);
        counts
    }

    /// Full display snapshot; refreshes `mode` from the queues first.
    pub fn snapshot(&mut self) -> SessionSnapshot {
        self.peek_next();
        SessionSnapshot {
            mode: self.mode,
            library: self.state.current_library.clone(),
            visible_elapsed_sec: self.state.visible_elapsed_sec,
            due_count: self.state.due_now.len(),
            review_count: self.state.review_queue.len(),
            new_count: self.state.new_queue.len(),
            ui_index: self.ui_index(),
            ui_total: self.ui_total(),
            total_words: self.total_words(),
            completed2d_count: self.state.completed2d_count,
            current: self.current_word().cloned(),
        }
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Advance to the next word. If the cursor sits inside history
    /// (after `prev`), this only moves the cursor forward; otherwise
    /// it consumes the head of the priority queues, records the
    /// presentation, and persists.
    pub fn next(&mut self) {
        if self.state.hist_pos < self.state.history.len() as i64 - 1 {
            self.state.hist_pos += 1;
            return;
        }
        if let Some(w) = self.consume_next() {
            // A returning 2-day word counts as one completed 2d review.
            if self.stage(&w.id) == Stage::Due2d {
                self.state.completed2d_count += 1;
            }
            self.record_seen(&w);
        }
        self.check_thirty_at(clock::now_ms());
        self.persist_best_effort();
    }

    /// Step back in history. Never consumes queues, never logs a
    /// presentation.
    pub fn prev(&mut self) {
        if self.state.hist_pos > 0 {
            self.state.hist_pos -= 1;
        }
    }

    /// Guarantee a current word exists right after (re)initialization:
    /// consume one word and record it as seen.
    pub fn ensure_current(&mut self) {
        if self.state.history.is_empty() {
            if let Some(w) = self.consume_next() {
                self.record_seen(&w);
            }
        }
    }

    /// Pop the head word by strict priority. Popping from the review
    /// queue counts one review pass for the word.
    fn consume_next(&mut self) -> Option<Word> {
        if let Some(w) = self.state.review_queue.pop_front() {
            *self.state.review_passes.entry(w.id.clone()).or_insert(0) += 1;
            return Some(w);
        }
        self.state
            .due_now
            .pop_front()
            .or_else(|| self.state.new_queue.pop_front())
    }

    /// Promote `New` to `Seen`, append to history (discarding any redo
    /// branch), and log the presentation at the current elapsed second.
    fn record_seen(&mut self, w: &Word) {
        if self.stage(&w.id) == Stage::New {
            self.state.word_stage.insert(w.id.clone(), Stage::Seen);
        }
        self.push_history(w.id.clone());
        self.state.seen.push(SeenLog {
            word_id: w.id.clone(),
            seen_at_sec: self.state.visible_elapsed_sec,
        });
    }

    fn push_history(&mut self, id: String) {
        let keep = (self.state.hist_pos + 1).max(0) as usize;
        self.state.history.truncate(keep);
        self.state.history.push(id);
        self.state.hist_pos = self.state.history.len() as i64 - 1;
    }

    // ── Reinforcement ────────────────────────────────────────────────

    /// Advance the visible-session clock by one second and run the
    /// time-driven triggers. Call once per second, only while the host
    /// surface is visible -- a hidden surface must not advance time.
    pub fn tick(&mut self) {
        self.state.visible_elapsed_sec += 1;
        self.on_tick_at(clock::now_ms());
    }

    fn on_tick_at(&mut self, now_ms: i64) {
        let current_block = self.state.visible_elapsed_sec / self.block_size_sec;
        if current_block > self.state.last_processed_block {
            let start = self.state.last_processed_block * self.block_size_sec;
            let end = current_block * self.block_size_sec;
            self.harvest_block(start, end);
            self.state.last_processed_block = current_block;
        }
        self.check_thirty_at(now_ms);
        self.persist_shallow_best_effort();
    }

    /// Re-queue every word seen in `[start, end)` elapsed seconds,
    /// except the word currently on screen. One-shot per block.
    fn harvest_block(&mut self, start: u64, end: u64) {
        let mut ids: Vec<String> = Vec::new();
        let mut dedup: HashSet<&str> = HashSet::new();
        for log in &self.state.seen {
            if log.seen_at_sec >= start
                && log.seen_at_sec < end
                && dedup.insert(log.word_id.as_str())
            {
                ids.push(log.word_id.clone());
            }
        }
        let current = self.current_history_id().map(str::to_string);
        let queued = self.queued_ids();

        let mut items: Vec<Word> = Vec::new();
        for id in ids {
            if current.as_deref() == Some(id.as_str()) {
                continue;
            }
            if self.state.skipped_ids.contains(&id) || queued.contains(&id) {
                continue;
            }
            if let Some(w) = self.word(&id) {
                items.push(w.clone());
            }
        }
        for w in items {
            if self.stage(&w.id) == Stage::New {
                self.state.word_stage.insert(w.id.clone(), Stage::Block);
            }
            self.state.review_queue.push_back(w);
        }
    }

    /// One-shot full review at the total-session threshold, and
    /// finalization once the queues drain afterwards.
    fn check_thirty_at(&mut self, now_ms: i64) {
        if !self.state.thirty_triggered
            && self.state.visible_elapsed_sec >= self.total_session_sec
        {
            let mut ids: Vec<String> = Vec::new();
            let mut dedup: HashSet<&str> = HashSet::new();
            for log in &self.state.seen {
                if dedup.insert(log.word_id.as_str()) {
                    ids.push(log.word_id.clone());
                }
            }
            let queued = self.queued_ids();
            let mut items: Vec<Word> = Vec::new();
            for id in ids {
                if self.state.skipped_ids.contains(&id) || queued.contains(&id) {
                    continue;
                }
                if let Some(w) = self.word(&id) {
                    items.push(w.clone());
                }
            }
            for w in items {
                self.state.word_stage.insert(w.id.clone(), Stage::Session);
                self.state.review_queue.push_back(w);
            }
            self.state.thirty_triggered = true;
        }
        if self.state.thirty_triggered && !self.finished && self.state.queues_empty() {
            self.finish_session_at(now_ms);
        }
    }

    /// Schedule 2-day and 7-day recalls for every distinct seen word
    /// and mark the session done.
    fn finish_session_at(&mut self, at_ms: i64) {
        let mut dedup: HashSet<&str> = HashSet::new();
        let ids: Vec<String> = self
            .state
            .seen
            .iter()
            .filter(|log| dedup.insert(log.word_id.as_str()))
            .map(|log| log.word_id.clone())
            .collect();
        for id in ids {
            self.scheduled
                .append(id.clone(), clock::add_days(at_ms, 2), ReviewReason::TwoDay);
            self.scheduled
                .append(id, clock::add_days(at_ms, 7), ReviewReason::SevenDay);
        }
        self.save_schedules_best_effort();
        self.mode = Mode::Done;
        self.finished = true;
    }

    // ── Skip ─────────────────────────────────────────────────────────

    /// Permanently exclude the word at the cursor from this library:
    /// out of all queues and out of the schedule store. Only a full
    /// `reinitialize` makes it eligible again.
    pub fn skip_current(&mut self) {
        let Some(id) = self.current_history_id().map(str::to_string) else {
            return;
        };
        self.state.skipped_ids.insert(id.clone());
        self.state.due_now.retain(|w| w.id != id);
        self.state.review_queue.retain(|w| w.id != id);
        self.state.new_queue.retain(|w| w.id != id);
        self.scheduled.remove_for_word(&id);
        self.save_schedules_best_effort();
        self.persist_best_effort();
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// First load: restore the global library selection, load its
    /// catalog and schedule store, restore or create session state,
    /// fold in due long-term reviews, and make sure a current word
    /// exists.
    ///
    /// # Errors
    /// Fails only on catalog load failure, in which case no session
    /// state has been mutated.
    pub async fn initialize(&mut self) -> Result<()> {
        let library = state::load_global_library(&self.store)
            .unwrap_or_else(|| self.state.current_library.clone());
        let words = self.loader.load_library(&library).await?;
        self.adopt_library(&library, words);
        Ok(())
    }

    /// Switch to another library, persisting the current one first.
    /// No-op when `id` is already selected.
    ///
    /// # Errors
    /// Fails only on catalog load failure; the current library stays
    /// active and untouched in that case.
    pub async fn change_library(&mut self, id: &str) -> Result<()> {
        if self.state.current_library == id {
            return Ok(());
        }
        self.persist_best_effort();
        self.save_schedules_best_effort();
        let words = self.loader.load_library(id).await?;
        self.adopt_library(id, words);
        Ok(())
    }

    /// Restart the current library's session from scratch (fresh
    /// queues, stages, skips, counters) while leaving the long-term
    /// schedule store untouched.
    ///
    /// # Errors
    /// Fails only on catalog load failure; state is untouched then.
    pub async fn reinitialize(&mut self) -> Result<()> {
        let library = self.state.current_library.clone();
        let words = self.loader.load_library(&library).await?;
        self.install_catalog(words);
        self.state = SessionState::fresh(&library, &self.base_words);
        self.mode = Mode::New;
        self.finished = false;
        self.persist_best_effort();
        self.ensure_current();
        Ok(())
    }

    /// Common load path: install the catalog, restore-or-fresh the
    /// session blob, reconcile due reviews, persist, ensure a word.
    fn adopt_library(&mut self, library: &str, words: Vec<Word>) {
        self.install_catalog(words);
        self.scheduled = ScheduleStore::load(&self.store, library);
        self.state = SessionState::load(&self.store, library)
            .unwrap_or_else(|| SessionState::fresh(library, &self.base_words));
        self.finished = self.state.thirty_triggered && self.state.queues_empty();
        self.mode = Mode::New;
        self.reconcile_due_at(clock::now_ms());
        self.persist_best_effort();
        self.ensure_current();
    }

    fn install_catalog(&mut self, words: Vec<Word>) {
        self.by_id = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.id.clone(), i))
            .collect();
        self.base_words = words;
    }

    /// Fold due schedule entries into `due_now` (front, store order).
    /// Entries for skipped or already-queued words are discarded
    /// without re-queueing; every processed word's entries (both
    /// horizons) leave the store.
    fn reconcile_due_at(&mut self, now_ms: i64) {
        let due = self.scheduled.due_at(now_ms);
        if due.is_empty() {
            return;
        }
        let mut queued = self.queued_ids();
        let mut removed: HashSet<String> = HashSet::new();
        let mut front: Vec<Word> = Vec::new();
        for entry in due {
            if removed.contains(&entry.word_id) {
                continue;
            }
            if self.state.skipped_ids.contains(&entry.word_id)
                || queued.contains(&entry.word_id)
            {
                removed.insert(entry.word_id);
                continue;
            }
            // A word no longer in the catalog keeps its entry.
            if let Some(w) = self.word(&entry.word_id) {
                front.push(w.clone());
                if entry.reason == ReviewReason::TwoDay {
                    self.state
                        .word_stage
                        .insert(entry.word_id.clone(), Stage::Due2d);
                }
                queued.insert(entry.word_id.clone());
                removed.insert(entry.word_id);
            }
        }
        for w in front.into_iter().rev() {
            self.state.due_now.push_front(w);
        }
        if !removed.is_empty() {
            self.scheduled.remove_words(&removed);
            self.save_schedules_best_effort();
        }
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Write the full session blob and the global library pointer.
    pub fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.state)?;
        self.store
            .set(&state::state_key(&self.state.current_library), &raw)?;
        state::save_global_library(&self.store, &self.state.current_library)?;
        Ok(())
    }

    /// Rewrite only the volatile timer fields over the last full
    /// snapshot; falls back to a full persist when none exists.
    fn persist_shallow(&self) -> Result<()> {
        let key = state::state_key(&self.state.current_library);
        let Some(raw) = self.store.get(&key)? else {
            return self.persist();
        };
        let Ok(mut snapshot) = serde_json::from_str::<serde_json::Value>(&raw) else {
            return self.persist();
        };
        let Some(obj) = snapshot.as_object_mut() else {
            return self.persist();
        };
        obj.insert(
            "visibleElapsedSec".into(),
            serde_json::json!(self.state.visible_elapsed_sec),
        );
        obj.insert(
            "lastProcessedBlock".into(),
            serde_json::json!(self.state.last_processed_block),
        );
        obj.insert(
            "thirtyTriggered".into(),
            serde_json::json!(self.state.thirty_triggered),
        );
        self.store.set(&key, &snapshot.to_string())?;
        Ok(())
    }

    // Storage writes are fire-and-forget: a failed write must never
    // take the session down.
    fn persist_best_effort(&self) {
        if let Err(e) = self.persist() {
            eprintln!("lexiloop: session persist failed: {e}");
        }
    }

    fn persist_shallow_best_effort(&self) {
        if let Err(e) = self.persist_shallow() {
            eprintln!("lexiloop: shallow persist failed: {e}");
        }
    }

    fn save_schedules_best_effort(&self) {
        if let Err(e) = self.scheduled.save(&self.store, &self.state.current_library) {
            eprintln!("lexiloop: schedule persist failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::schedule::schedule_key;
    use crate::storage::MemoryStore;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[derive(Clone, Default)]
    struct StaticLoader {
        libs: HashMap<String, Vec<Word>>,
    }

    impl StaticLoader {
        fn with(mut self, id: &str, words: Vec<Word>) -> Self {
            self.libs.insert(id.to_string(), words);
            self
        }
    }

    impl CatalogLoader for StaticLoader {
        async fn load_library(&self, id: &str) -> Result<Vec<Word>, LoadError> {
            Ok(self.libs.get(id).cloned().unwrap_or_default())
        }
    }

    fn word(id: &str) -> Word {
        Word {
            id: id.into(),
            term: id.into(),
            phonetic: None,
            meaning: format!("meaning of {id}"),
            examples: None,
        }
    }

    fn words(n: usize) -> Vec<Word> {
        (0..n).map(|i| word(&format!("w{i}"))).collect()
    }

    async fn engine(n: usize, store: MemoryStore) -> SessionEngine<MemoryStore, StaticLoader> {
        let loader = StaticLoader::default().with("lib", words(n));
        let mut e = SessionEngine::new(store, loader, "lib");
        e.initialize().await.unwrap();
        e
    }

    fn queue_ids(state: &SessionState) -> Vec<String> {
        state
            .due_now
            .iter()
            .chain(state.review_queue.iter())
            .chain(state.new_queue.iter())
            .map(|w| w.id.clone())
            .collect()
    }

    fn assert_queues_unique(e: &SessionEngine<MemoryStore, StaticLoader>) {
        let ids = queue_ids(e.state());
        let set: HashSet<&String> = ids.iter().collect();
        assert_eq!(set.len(), ids.len(), "duplicate id across queues: {ids:?}");
    }

    #[tokio::test]
    async fn initialize_serves_a_current_word() {
        let e = engine(3, MemoryStore::new()).await;
        assert_eq!(e.current_word().unwrap().id, "w0");
        assert_eq!(e.state().history, vec!["w0"]);
        assert_eq!(e.stage("w0"), Stage::Seen);
        assert_eq!(e.total_words(), 3);
        assert_eq!(e.total_count(), 2);
        // First word is consumed directly from the new queue.
        assert_eq!(e.state().seen.len(), 1);
    }

    #[tokio::test]
    async fn consumption_priority_is_review_due_new() {
        let mut e = engine(4, MemoryStore::new()).await;
        // Move catalog words into the other queues by hand.
        let w3 = e.state.new_queue.pop_back().unwrap();
        let w2 = e.state.new_queue.pop_back().unwrap();
        e.state.review_queue.push_back(w3);
        e.state.due_now.push_back(w2);
        e.next();
        assert_eq!(e.current_word().unwrap().id, "w3");
        assert_eq!(e.review_passes_for("w3"), 1);
        e.next();
        assert_eq!(e.current_word().unwrap().id, "w2");
        e.next();
        assert_eq!(e.current_word().unwrap().id, "w1");
    }

    #[tokio::test]
    async fn prev_then_next_returns_same_word_without_logging() {
        let mut e = engine(3, MemoryStore::new()).await;
        e.next();
        let before = e.current_word().unwrap().id.clone();
        let seen_before = e.state().seen.len();
        e.prev();
        assert_eq!(e.current_word().unwrap().id, "w0");
        assert_eq!(e.state().seen.len(), seen_before);
        e.next();
        assert_eq!(e.current_word().unwrap().id, before);
        assert_eq!(e.state().seen.len(), seen_before);
    }

    #[tokio::test]
    async fn forward_cursor_moves_consume_nothing_until_end() {
        let mut e = engine(4, MemoryStore::new()).await;
        e.next();
        e.next();
        assert_eq!(e.state().history, vec!["w0", "w1", "w2"]);
        e.prev();
        e.prev();
        let new_len = e.state().new_queue.len();
        e.next(); // cursor forward onto w1
        e.next(); // cursor forward onto w2
        assert_eq!(e.state().new_queue.len(), new_len);
        assert_eq!(e.state().seen.len(), 3);
        e.next(); // back at the end: consumes w3
        assert_eq!(e.state().history, vec!["w0", "w1", "w2", "w3"]);
        assert_eq!(e.state().hist_pos, 3);
        assert_eq!(e.state().seen.len(), 4);
    }

    #[tokio::test]
    async fn block_boundary_requeues_seen_words_once() {
        let loader = StaticLoader::default().with("lib", words(3));
        let mut e = SessionEngine::new(MemoryStore::new(), loader, "lib")
            .with_durations(300, 1800);
        e.initialize().await.unwrap();
        // w0 seen at sec 0 by ensure_current; w1 seen at sec 120.
        for _ in 0..120 {
            e.tick();
        }
        e.next();
        assert_eq!(e.current_word().unwrap().id, "w1");
        for _ in 0..185 {
            e.tick();
        }
        assert_eq!(e.visible_elapsed_sec(), 305);
        assert_eq!(e.state().last_processed_block, 1);
        // w1 is the current word at the boundary and stays out.
        let review: Vec<_> = e.state().review_queue.iter().map(|w| &w.id).collect();
        assert_eq!(review, ["w0"]);
        assert_eq!(e.stage("w0"), Stage::Block);
        assert_eq!(e.stage("w1"), Stage::Seen);
        // The same block never fires twice.
        for _ in 0..305 {
            e.tick();
        }
        assert_eq!(e.state().last_processed_block, 2);
        let count = e
            .state()
            .review_queue
            .iter()
            .filter(|w| w.id == "w0")
            .count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn thirty_trigger_queues_every_seen_word_once() {
        let loader = StaticLoader::default().with("lib", words(3));
        let mut e = SessionEngine::new(MemoryStore::new(), loader, "lib")
            .with_durations(300, 5);
        e.initialize().await.unwrap();
        e.next(); // w1 seen
        for _ in 0..5 {
            e.tick();
        }
        assert!(e.state().thirty_triggered);
        let review: Vec<_> = e.state().review_queue.iter().map(|w| &w.id).collect();
        assert_eq!(review, ["w0", "w1"]);
        assert_eq!(e.stage("w0"), Stage::Session);
        assert_eq!(e.stage("w1"), Stage::Session);
        assert_queues_unique(&e);
        // Re-entering the check must not duplicate anything.
        e.tick();
        assert_eq!(e.state().review_queue.len(), 2);
    }

    #[tokio::test]
    async fn draining_after_trigger_finalizes_exactly_once() {
        let loader = StaticLoader::default().with("lib", words(2));
        let mut e = SessionEngine::new(MemoryStore::new(), loader, "lib")
            .with_durations(300, 3);
        e.initialize().await.unwrap();
        e.next(); // w1
        for _ in 0..3 {
            e.tick();
        }
        // review queue now holds w0 and w1; drain everything.
        e.next();
        e.next();
        assert!(e.state().queues_empty());
        assert_eq!(e.mode(), Mode::Done);
        // 2 distinct seen words, two horizons each.
        assert_eq!(e.schedule_store().len(), 4);
        // Observing the empty queues again must not re-schedule.
        e.tick();
        e.next();
        assert_eq!(e.schedule_store().len(), 4);
        for id in ["w0", "w1"] {
            let horizons: Vec<_> = e
                .schedule_store()
                .entries()
                .iter()
                .filter(|s| s.word_id == id)
                .map(|s| s.reason)
                .collect();
            assert_eq!(horizons, [ReviewReason::TwoDay, ReviewReason::SevenDay]);
        }
    }

    #[tokio::test]
    async fn finish_schedules_exact_two_and_seven_day_offsets() {
        let mut e = engine(2, MemoryStore::new()).await;
        let at = 1_000_000;
        e.finish_session_at(at);
        let entries = e.schedule_store().entries();
        assert_eq!(entries.len(), 2); // one seen word, two horizons
        assert_eq!(entries[0].due_at, at + 2 * clock::MS_PER_DAY);
        assert_eq!(entries[1].due_at, at + 7 * clock::MS_PER_DAY);
        assert_eq!(e.mode(), Mode::Done);
    }

    #[tokio::test]
    async fn due_reconciliation_front_loads_in_store_order() {
        let store = MemoryStore::new();
        {
            let mut e = engine(4, store.clone()).await;
            e.next();
            e.next(); // w0..w2 consumed out of the queues
        }
        // Schedule w1 and w0 as due (store order w1 first), w3 far future.
        let mut sched = ScheduleStore::default();
        sched.append("w1", 10, ReviewReason::TwoDay);
        sched.append("w1", i64::MAX, ReviewReason::SevenDay);
        sched.append("w0", 20, ReviewReason::SevenDay);
        sched.append("w3", i64::MAX, ReviewReason::TwoDay);
        sched.save(&store, "lib").unwrap();

        let mut e = engine(4, store).await;
        let due: Vec<_> = e.state().due_now.iter().map(|w| w.id.clone()).collect();
        assert_eq!(due, ["w1", "w0"]);
        // Only the 2d horizon sets the explicit recall stage.
        assert_eq!(e.stage("w1"), Stage::Due2d);
        assert_eq!(e.stage("w0"), Stage::Seen);
        // Both of w1's horizons left the store; w3 remains pending.
        let remaining: Vec<_> = e
            .schedule_store()
            .entries()
            .iter()
            .map(|s| s.word_id.clone())
            .collect();
        assert_eq!(remaining, ["w3"]);
        assert_queues_unique(&e);
        // Consuming the 2d word bumps the achievement counter.
        while e.current_word().map(|w| w.id.clone()) != Some("w1".into()) {
            e.next();
        }
        assert!(e.completed_two_day_count() >= 1);
    }

    #[tokio::test]
    async fn reconciled_due_word_is_not_requeued_by_triggers() {
        let store = MemoryStore::new();
        {
            let mut e = engine(3, store.clone()).await;
            e.next();
            e.next(); // w0..w2 all seen, queues drained
        }
        let mut sched = ScheduleStore::default();
        sched.append("w0", 10, ReviewReason::TwoDay);
        sched.save(&store, "lib").unwrap();

        let loader = StaticLoader::default().with("lib", words(3));
        let mut e = SessionEngine::new(store, loader, "lib").with_durations(300, 5);
        e.initialize().await.unwrap();
        let due: Vec<_> = e.state().due_now.iter().map(|w| w.id.clone()).collect();
        assert_eq!(due, ["w0"]);
        for _ in 0..5 {
            e.tick();
        }
        // The full-review trigger must leave the due-resident word alone.
        assert!(e.state().thirty_triggered);
        assert!(e.state().review_queue.iter().all(|w| w.id != "w0"));
        assert_queues_unique(&e);
        // One presentation, one completed 2d review.
        while e.current_word().map(|w| w.id.clone()) != Some("w0".into()) {
            e.next();
        }
        assert_eq!(e.completed_two_day_count(), 1);
    }

    #[tokio::test]
    async fn cursor_position_survives_restart_after_prev_and_next() {
        let store = MemoryStore::new();
        {
            let mut e = engine(4, store.clone()).await;
            e.next();
            e.next();
            e.prev();
            e.prev();
            e.next(); // forward cursor move, nothing consumed
            e.persist().unwrap();
        }
        let e = engine(4, store).await;
        assert_eq!(e.state().hist_pos, 1);
        assert_eq!(e.current_word().unwrap().id, "w1");
    }

    #[tokio::test]
    async fn shallow_persist_recovers_from_non_object_blob() {
        let store = MemoryStore::new();
        let mut e = engine(3, store.clone()).await;
        store.set(&state::state_key("lib"), "[1]").unwrap();
        e.tick();
        let raw = store.get(&state::state_key("lib")).unwrap().unwrap();
        let blob: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(blob["visibleElapsedSec"], 1);
        assert_eq!(blob["currentLibrary"], "lib");
    }

    #[tokio::test]
    async fn due_entry_for_queued_word_is_discarded_not_duplicated() {
        let store = MemoryStore::new();
        let mut sched = ScheduleStore::default();
        sched.append("w1", 10, ReviewReason::TwoDay);
        sched.save(&store, "lib").unwrap();
        // Fresh session: w1 still sits in the new queue, so the due
        // entry is dropped without re-queueing.
        let e = engine(3, store).await;
        assert!(e.state().due_now.is_empty());
        assert!(e.schedule_store().is_empty());
        assert_queues_unique(&e);
    }

    #[tokio::test]
    async fn skip_current_excludes_everywhere_until_reinit() {
        let store = MemoryStore::new();
        let mut sched = ScheduleStore::default();
        sched.append("w0", i64::MAX, ReviewReason::TwoDay);
        sched.save(&store, "lib").unwrap();
        let mut e = engine(3, store.clone()).await;
        assert_eq!(e.current_word().unwrap().id, "w0");
        e.skip_current();
        assert!(queue_ids(e.state()).iter().all(|id| id != "w0"));
        assert!(e.schedule_store().is_empty());
        let raw = store.get(&schedule_key("lib")).unwrap().unwrap();
        assert_eq!(raw, "[]");
        // Block and thirty triggers must also ignore it.
        for _ in 0..e.total_session_sec {
            e.tick();
        }
        assert!(e
            .state()
            .review_queue
            .iter()
            .all(|w| w.id != "w0"));
        // Reinitialize clears the skip set; w0 is new material again.
        e.reinitialize().await.unwrap();
        assert!(e.state().skipped_ids.is_empty());
        assert_eq!(e.current_word().unwrap().id, "w0");
        assert_eq!(e.completed_two_day_count(), 0);
    }

    #[tokio::test]
    async fn persisted_state_restores_equivalently() {
        let store = MemoryStore::new();
        {
            let mut e = engine(5, store.clone()).await;
            e.next();
            e.next();
            e.tick();
            e.next();
        }
        let mut a = engine(5, store.clone()).await;
        let mut b = engine(5, store).await;
        assert_eq!(
            a.current_word().map(|w| w.id.clone()),
            b.current_word().map(|w| w.id.clone())
        );
        assert_eq!(a.state().hist_pos, b.state().hist_pos);
        assert_eq!(queue_ids(a.state()), queue_ids(b.state()));
        assert_eq!(a.visible_elapsed_sec(), 1);
        assert_eq!(a.snapshot().current, b.snapshot().current);
    }

    #[tokio::test]
    async fn corrupt_state_blob_falls_back_to_fresh() {
        let store = MemoryStore::new();
        store.set(&state::state_key("lib"), "not json at all").unwrap();
        let e = engine(3, store).await;
        // Fresh session: first word consumed, the rest still new.
        assert_eq!(e.state().history, vec!["w0"]);
        assert_eq!(e.state().new_queue.len(), 2);
    }

    #[tokio::test]
    async fn empty_catalog_ends_in_done_mode() {
        let loader = StaticLoader::default();
        let mut e = SessionEngine::new(MemoryStore::new(), loader, "missing");
        e.initialize().await.unwrap();
        assert!(e.current_word().is_none());
        assert!(e.peek_next().is_none());
        assert_eq!(e.mode(), Mode::Done);
        e.next();
        e.tick();
        assert!(e.state().queues_empty());
    }

    #[tokio::test]
    async fn change_library_restores_or_seeds_and_flips_pointer() {
        let store = MemoryStore::new();
        let loader = StaticLoader::default()
            .with("lib", words(3))
            .with("other", vec![word("o0"), word("o1")]);
        let mut e = SessionEngine::new(store.clone(), loader.clone(), "lib");
        e.initialize().await.unwrap();
        e.next();
        e.change_library("other").await.unwrap();
        assert_eq!(e.library(), "other");
        assert_eq!(e.current_word().unwrap().id, "o0");
        // Switching back restores the previous library's progress.
        e.change_library("lib").await.unwrap();
        assert_eq!(e.current_word().unwrap().id, "w1");
        assert_eq!(e.state().history, vec!["w0", "w1"]);
        // A brand-new engine picks up the global pointer.
        let mut again = SessionEngine::new(store, loader, "other");
        again.initialize().await.unwrap();
        assert_eq!(again.library(), "lib");
    }

    #[tokio::test]
    async fn change_library_to_same_id_is_noop() {
        let mut e = engine(3, MemoryStore::new()).await;
        e.next();
        let before = e.state().history.clone();
        e.change_library("lib").await.unwrap();
        assert_eq!(e.state().history, before);
    }

    #[tokio::test]
    async fn upcoming_words_prefers_forward_history() {
        let mut e = engine(5, MemoryStore::new()).await;
        e.next();
        e.next();
        e.prev();
        e.prev();
        let ids: Vec<_> = e.upcoming_words(3).iter().map(|w| w.id.clone()).collect();
        // Forward history first (w1, w2), then the new-queue head.
        assert_eq!(ids, ["w1", "w2", "w3"]);
        // Lookahead never consumes anything.
        assert_eq!(e.state().new_queue.len(), 2);
        assert_eq!(e.upcoming_words(0).len(), 0);
    }

    #[tokio::test]
    async fn stage_counts_track_catalog_minus_skips() {
        let mut e = engine(4, MemoryStore::new()).await;
        e.next();
        let counts = e.stage_counts();
        assert_eq!(counts.seen, 2);
        assert_eq!(counts.new, 2);
        e.skip_current(); // skips w1, already staged seen
        let counts = e.stage_counts();
        assert_eq!(counts.seen, 1);
        assert_eq!(counts.new, 2);
    }

    fn drive(ops: &[u8]) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let store = MemoryStore::new();
        let loader = StaticLoader::default().with("lib", words(8));
        {
            let mut seed = SessionEngine::new(store.clone(), loader.clone(), "lib");
            rt.block_on(seed.initialize()).unwrap();
            seed.next();
            seed.next(); // w0..w2 seen and out of the queues
        }
        let mut sched = ScheduleStore::default();
        sched.append("w0", 0, ReviewReason::TwoDay);
        sched.append("w2", 0, ReviewReason::SevenDay);
        sched.save(&store, "lib").unwrap();
        let mut e = SessionEngine::new(store, loader, "lib").with_durations(7, 40);
        rt.block_on(e.initialize()).unwrap();
        assert_queues_unique(&e);
        for op in ops {
            match op % 4 {
                0 => e.next(),
                1 => e.prev(),
                2 => e.tick(),
                _ => e.skip_current(),
            }
            assert_queues_unique(&e);
            let max = e.state().history.len() as i64 - 1;
            assert!(e.state().hist_pos >= -1 && e.state().hist_pos <= max);
        }
    }

    proptest! {
        #[test]
        fn queues_never_share_a_word(ops in proptest::collection::vec(any::<u8>(), 1..120)) {
            drive(&ops);
        }
    }
}
