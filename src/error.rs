//! Centralized error types for mboxsession.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxsession library.
#[derive(Error, Debug)]
pub enum SessionError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A positioned read from an already opened archive failed, for example
    /// because the file was truncated underneath the session.
    #[error("Archive read failed at offset {offset} in '{path}': {source}")]
    Read {
        path: PathBuf,
        offset: u64,
        source: std::io::Error,
    },

    /// The specified archive does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// The session id is unknown or the session has been closed.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// The message id is malformed or does not resolve to a message.
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// The message exists but has no attachment at this position.
    #[error("Attachment {index} not found in message {message_id}")]
    AttachmentNotFound { message_id: String, index: usize },

    /// The MIME decoder rejected a message.
    #[error("MIME decoding error: {0}")]
    DecodeFailure(String),
}

/// Coarse classification of a [`SessionError`], for callers that map
/// errors onto their own protocol (status codes, IPC error tags).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive could not be opened or indexed.
    OpenFailure,
    /// An open session could not read message bytes back from its archive.
    ReadFailure,
    /// Unknown or closed session id.
    InvalidSession,
    /// Unknown message id or attachment index.
    NotFound,
    /// The decoder rejected the message bytes.
    DecodeFailure,
}

/// Convenience alias for `Result<T, SessionError>`.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Read` variant for a failed positioned read.
    pub fn read(path: impl Into<PathBuf>, offset: u64, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            offset,
            source,
        }
    }

    /// Reclassify a read failure as an open failure.
    ///
    /// Reads issued while indexing belong to opening the archive.
    pub fn during_open(self) -> Self {
        match self {
            Self::Read { path, source, .. } => Self::Io { path, source },
            other => other,
        }
    }

    /// Classify this error.
    ///
    /// `Io` comes only from opening, scanning or indexing an archive.
    /// Reads against a session that is already open report `ReadFailure`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::FileNotFound(_) => ErrorKind::OpenFailure,
            Self::Read { .. } => ErrorKind::ReadFailure,
            Self::InvalidSession(_) => ErrorKind::InvalidSession,
            Self::MessageNotFound(_) | Self::AttachmentNotFound { .. } => ErrorKind::NotFound,
            Self::DecodeFailure(_) => ErrorKind::DecodeFailure,
        }
    }
}
