//! Error types for padsync

use thiserror::Error;

/// Main error type for padsync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// The bus transport is unreachable or rejected an operation
    #[error("Bus error: {0}")]
    Bus(String),

    /// The addressable peer name for a channel could not be claimed
    #[error("Registration failed: {0}")]
    Registration(String),

    /// A content-query reply was missing, timed out, or was malformed
    #[error("Invalid reply: {0}")]
    InvalidReply(String),

    /// Error encoding or decoding a wire frame
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A file could not be written
    #[error("Cannot save: {0}")]
    Save(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using SyncError
pub type SyncResult<T> = Result<T, SyncError>;
