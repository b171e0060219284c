//! Custom error types for BruceFlash

use std::fmt;

/// Main error type for BruceFlash operations
#[derive(Debug)]
pub enum BruceFlashError {
    /// Configuration related errors
    Config(String),
    /// Command store errors
    Store(String),
    /// General I/O errors
    Io(std::io::Error),
    /// Serialization errors
    Serialization(String),
}

impl fmt::Display for BruceFlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BruceFlashError::Config(msg) => write!(f, "Configuration error: {}", msg),
            BruceFlashError::Store(msg) => write!(f, "Command store error: {}", msg),
            BruceFlashError::Io(err) => write!(f, "I/O error: {}", err),
            BruceFlashError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for BruceFlashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BruceFlashError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BruceFlashError {
    fn from(err: std::io::Error) -> Self {
        BruceFlashError::Io(err)
    }
}

impl From<serde_json::Error> for BruceFlashError {
    fn from(err: serde_json::Error) -> Self {
        BruceFlashError::Serialization(err.to_string())
    }
}

/// Result type alias for BruceFlash operations
pub type Result<T> = std::result::Result<T, BruceFlashError>;
