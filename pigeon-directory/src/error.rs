//! Error types for directory operations

use thiserror::Error;

/// Errors that can occur while talking to a directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory could not be reached or refused to answer
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    /// The directory configuration is unusable
    #[error("Invalid directory configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for directory operations
pub type Result<T> = std::result::Result<T, DirectoryError>;
