//! Persistence: data directory resolution, the key-value store trait,
//! and its SQLite / in-memory implementations.

mod config;
pub mod database;

pub use config::{Config, SessionConfig};
pub use database::Database;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::DatabaseError;

/// Returns `~/.config/lexiloop[-dev]/` based on LEXILOOP_ENV.
///
/// Set LEXILOOP_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("LEXILOOP_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("lexiloop-dev")
    } else {
        base_dir.join("lexiloop")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Opaque string-keyed store the engine persists through.
///
/// The engine treats stored values as JSON blobs but the store itself
/// has no schema knowledge. Writes carry no transactionality.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
}

/// In-memory store. Clones share the same backing map, which lets a
/// test hand "the same storage" to two engine instances.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let map = self
            .inner
            .lock()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
