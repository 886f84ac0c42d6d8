//! Error types for Kairos

use std::io;
use thiserror::Error;

/// Main error type for Kairos
#[derive(Error, Debug)]
pub enum KairosError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Engine initialization error: {0}")]
    EngineInit(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Kairos operations
pub type Result<T> = std::result::Result<T, KairosError>;

impl From<String> for KairosError {
    fn from(s: String) -> Self {
        KairosError::Other(s)
    }
}

impl From<&str> for KairosError {
    fn from(s: &str) -> Self {
        KairosError::Other(s.to_string())
    }
}
