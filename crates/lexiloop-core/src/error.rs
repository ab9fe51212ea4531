//! Core error types for lexiloop-core.
//!
//! This module defines the error hierarchy using thiserror. Catalog
//! load failures are fatal to the operation that triggered them;
//! persistence read failures are generally treated as "no saved state"
//! by the callers instead of surfacing here.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for lexiloop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog load errors
    #[error("Catalog error: {0}")]
    Load(#[from] LoadError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid or unknown configuration key
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Catalog-load-specific errors.
///
/// An unknown library id is not an error -- loaders return an empty
/// word list for it.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Backing fetch returned a non-2xx status
    #[error("Failed to fetch library '{library}': HTTP {status}")]
    Status { library: String, status: u16 },

    /// HTTP transport failure
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Local file read failure
    #[error("Failed to read library '{library}': {source}")]
    Read {
        library: String,
        #[source]
        source: std::io::Error,
    },

    /// Library payload is not the expected JSON shape
    #[error("Failed to parse library '{library}': {source}")]
    Parse {
        library: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
