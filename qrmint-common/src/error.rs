//! Common error types for qrmint

use thiserror::Error;

/// Common result type for qrmint operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the extractor, the artifact store and configuration
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage key is not a canonical artifact key
    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),

    /// Store lock was poisoned by a panicking writer
    #[error("Internal error: {0}")]
    Internal(String),
}
