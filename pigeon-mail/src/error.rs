//! Error types for the pigeon-mail server.
//!
//! Framing and parsing failures never end a session on their own; the session
//! answers them with a malformed-request response and keeps reading.

use std::io;

use thiserror::Error;

/// Errors that can occur while reading a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The frame payload exceeded the frame limit and was discarded.
    #[error("Frame exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Errors that can occur while parsing a command frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The frame had no keyword line.
    #[error("Empty request")]
    Empty,

    /// A required line was missing or blank.
    #[error("Missing {0}")]
    MissingField(&'static str),

    /// The message ordinal was not a number.
    #[error("Invalid message number: {0:?}")]
    InvalidOrdinal(String),
}
