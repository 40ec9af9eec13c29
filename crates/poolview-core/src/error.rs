//! Error types for PoolView.

use thiserror::Error;

/// Main error type for PoolView operations.
#[derive(Error, Debug)]
pub enum PoolViewError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for PoolView operations.
pub type Result<T> = std::result::Result<T, PoolViewError>;
