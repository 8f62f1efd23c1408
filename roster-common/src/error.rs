//! Common error types for the roster dashboard

use thiserror::Error;

/// Common result type for roster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the dashboard crates
///
/// Refresh deadlines are deliberately absent: a wait that runs out resolves
/// to an outcome, not an error, because the backend job may still finish.
#[derive(Error, Debug)]
pub enum Error {
    /// Network or decode failure talking to the backend
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-OK response or an `error` key in the payload, message kept verbatim
    #[error("{0}")]
    Backend(String),

    /// Malformed filter, sort, column or target input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Configuration loading or parsing error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background task panicked or was aborted
    #[error("Task error: {0}")]
    Task(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures that a later retry may cure; refresh polling logs these at debug
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
