//! # Lexiloop Core Library
//!
//! This library provides the core business logic for Lexiloop, a
//! vocabulary flashcard scheduler. It implements a CLI-first philosophy
//! where all operations are available via a standalone CLI binary, with
//! any GUI being a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Session Engine**: A caller-driven state machine that owns the
//!   three word queues (due / review / new), presentation history, and
//!   the reinforcement triggers. The caller invokes `tick()` once per
//!   visible second for time-based progress.
//! - **Storage**: SQLite-backed key-value persistence and TOML-based
//!   configuration
//! - **Catalog**: Pluggable loaders that fetch and normalize raw word
//!   lists into immutable [`Word`] records
//! - **Schedule**: Per-library store of pending long-term (2-day /
//!   7-day) reviews
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`Database`]: Key-value persistence adapter
//! - [`Config`]: Application configuration management
//! - [`CatalogLoader`]: Trait for vocabulary sources

pub mod catalog;
pub mod clock;
pub mod error;
pub mod schedule;
pub mod session;
pub mod storage;
pub mod word;

pub use catalog::{CatalogLoader, LibraryFormat, LibraryMeta, SourceCatalogLoader};
pub use error::{ConfigError, CoreError, DatabaseError, LoadError};
pub use schedule::ScheduleStore;
pub use session::{SessionEngine, SessionSnapshot, SessionState, StageCounts};
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use word::{Mode, ReviewReason, ScheduledReview, SeenLog, Stage, Word};
