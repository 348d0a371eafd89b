//! Common error types for Podium

use thiserror::Error;

/// Common result type for Podium operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Podium services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input to a fingerprint or session operation
    #[error("Validation error: {0}")]
    Validation(String),

    /// State-machine guard violation; reports the status the session
    /// actually holds so callers can distinguish "already reviewed"
    /// from "not found"
    #[error("Invalid transition: session is {current}")]
    InvalidTransition { current: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Current status carried by an InvalidTransition, if this is one.
    pub fn current_status(&self) -> Option<&str> {
        match self {
            Error::InvalidTransition { current } => Some(current),
            _ => None,
        }
    }
}
