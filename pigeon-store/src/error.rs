//! Error types for the pigeon-store crate.
//!
//! Every error carries a short, client-facing cause (see [`StoreError::cause`])
//! that sessions put after `ERR - ` when a mailbox operation fails.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Top-level store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O operation failed (directory listing, file read/write/delete).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The mailbox root was created but one of its boxes could not be.
    #[error("Unable to create mailbox directory {}: {source}", path.display())]
    MailboxCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No message exists at this ordinal.
    #[error("No message with ordinal {ordinal}")]
    NotFound { ordinal: usize },

    /// An identity or subject that cannot be used as a file name.
    #[error("Invalid name: {0:?}")]
    InvalidName(String),
}

impl StoreError {
    /// The human readable cause reported to clients.
    #[must_use]
    pub fn cause(&self) -> &'static str {
        match self {
            Self::Io(err) | Self::MailboxCreation { source: err, .. } => io_cause(err),
            Self::NotFound { .. } => "no such file or directory",
            Self::InvalidName(_) => "invalid argument",
        }
    }
}

/// Map an I/O failure onto the fixed catalogue of file-system causes.
#[must_use]
pub fn io_cause(err: &io::Error) -> &'static str {
    match err.raw_os_error() {
        Some(code) => errno_cause(code),
        None => match err.kind() {
            io::ErrorKind::PermissionDenied => "permission denied",
            io::ErrorKind::NotFound => "no such file or directory",
            io::ErrorKind::AlreadyExists => "file exists",
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => "invalid argument",
            io::ErrorKind::Interrupted => "interrupted system call",
            io::ErrorKind::WouldBlock => "resource temporarily unavailable",
            io::ErrorKind::Unsupported => "operation not supported",
            io::ErrorKind::OutOfMemory => "not enough core",
            _ => "unknown error",
        },
    }
}

const fn errno_cause(code: i32) -> &'static str {
    match code {
        libc::EACCES => "permission denied",
        libc::EBADF => "bad file number",
        libc::EMFILE => "too many open files",
        libc::ENFILE => "file table overflow",
        libc::ENOENT => "no such file or directory",
        libc::ENOMEM => "not enough core",
        libc::ENOTDIR => "not a directory",
        libc::EBUSY => "mount device busy",
        libc::EFAULT => "bad address",
        libc::EIO => "I/O error",
        libc::EISDIR => "is a directory",
        libc::ELOOP => "symbolic link loop",
        libc::ENAMETOOLONG => "path name is too long",
        libc::EPERM => "not super-user",
        libc::EROFS => "read only file system",
        libc::EINVAL => "invalid argument",
        libc::ENOTEMPTY => "directory not empty",
        libc::EDQUOT => "disc quota exceeded",
        libc::EEXIST => "file exists",
        libc::EFBIG => "file too large",
        libc::EINTR => "interrupted system call",
        libc::ENODEV => "no such device",
        libc::ENOSPC => "no space left on device",
        libc::ENXIO => "no such device or address",
        libc::EOPNOTSUPP => "operation not supported",
        libc::EOVERFLOW => "value too large to be stored in data type",
        libc::ETXTBSY => "text file busy",
        libc::EWOULDBLOCK => "resource temporarily unavailable",
        _ => "unknown error",
    }
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
