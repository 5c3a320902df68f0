//! Source Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;
use std::time::Duration;

/// A source error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configured driver name isn't one we know about.
    #[display("unsupported driver: {_0}")]
    UnsupportedDriver(#[error(not(source))] String),
    /// The driver exists but was compiled out of this build.
    #[display("driver not enabled in this build: {_0}")]
    DisabledDriver(#[error(not(source))] String),
    /// The connection string/URL/path for the selected driver is unusable.
    #[display("invalid connection string: {_0}")]
    InvalidConnection(#[error(not(source))] String),
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Query or connectivity failure against the flag database.
    #[display("database error")]
    Database,
    /// A database row could not be converted into a flag record.
    #[display("invalid database row: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// Network-related error (HTTP, S3 connections, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    #[display("timed out after {}ms", _0.as_millis())]
    Timeout(#[error(not(source))] Duration),
    /// The remote answered, but not with a success status.
    #[display("unexpected response status: {_0}")]
    Status(#[error(not(source))] u16),
    /// Payload is bigger than we are willing to buffer.
    #[display("payload exceeds {_0} bytes")]
    TooLarge(#[error(not(source))] u64),
    /// Payload is not a valid envelope.
    #[display("malformed envelope payload")]
    Decode,
    #[display("failed to encode envelope")]
    Encode,
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// A malformed payload counts as retryable: the next fetch may well
    /// return something different.
    pub fn is_retryable(&self) -> bool {
        !self.is_configuration()
    }

    /// Configuration errors are fatal: no amount of retrying fixes them.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnsupportedDriver(_) | Self::DisabledDriver(_) | Self::InvalidConnection(_))
    }

    pub(crate) fn map_io_error(e: IoError, path: impl Into<PathBuf>) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            _ => Self::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::UnsupportedDriver("mongo".to_string()).to_string(), "unsupported driver: mongo");
        assert_eq!(ErrorKind::Timeout(Duration::from_secs(2)).to_string(), "timed out after 2000ms");
        assert_eq!(ErrorKind::Status(503).to_string(), "unexpected response status: 503");
    }

    #[test]
    fn test_error_kind_retryable() {
        assert!(!ErrorKind::UnsupportedDriver("mongo".to_string()).is_retryable());
        assert!(!ErrorKind::InvalidConnection("bucket".to_string()).is_retryable());
        assert!(ErrorKind::Decode.is_retryable());
        assert!(ErrorKind::Network("reset".to_string()).is_retryable());
        assert!(ErrorKind::Database.is_retryable());
    }

    #[test]
    fn test_map_io_error() {
        let e = IoError::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(ErrorKind::map_io_error(e, "/tmp/flags.json"), ErrorKind::NotFound(_)));
        let e = IoError::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(ErrorKind::map_io_error(e, "/tmp/flags.json"), ErrorKind::PermissionDenied(_)));
        let e = IoError::other("disk on fire");
        assert!(matches!(ErrorKind::map_io_error(e, "/tmp/flags.json"), ErrorKind::Io(_)));
    }
}
