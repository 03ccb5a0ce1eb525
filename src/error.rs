//! Error types for the lesson engine

use std::io;
use thiserror::Error;

/// Main error type for the lesson engine
///
/// Only `CurriculumCorrupt` is fatal: no exercise can be constructed
/// without a valid curriculum. Everything else is recoverable and must
/// be surfaced to the session controller, never crash the process.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Curriculum is corrupt: {0}")]
    CurriculumCorrupt(String),

    #[error("No stored progress for profile '{0}'")]
    ProfileNotFound(String),

    #[error("Invalid profile id '{0}'")]
    InvalidProfileId(String),

    #[error("Stored progress is unreadable: {0}")]
    StorageCorrupt(String),

    #[error("Failed to write progress: {0}")]
    StorageWriteFailed(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("A session is already active for profile '{0}'")]
    SessionAlreadyActive(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}
