//! Error types for the mail client.

use std::io;

use thiserror::Error;

/// Errors that can occur when using the mail client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error occurred during network operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Connection was closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// The server answered with an `ERR` response.
    #[error("Server rejected the request: {0}")]
    Rejected(String),

    /// The server answered with something the client does not understand.
    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(String),
}

/// Specialized `Result` type for mail client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
