//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Source and entity errors are kept as
//! child frames underneath one of these kinds.

use derive_more::{Display, Error};
use flagcache_source::error::ErrorKind as SourceErrorKind;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source can't be built from the current configuration. Fatal at
    /// startup; retrying won't help until the configuration changes.
    #[display("flag source is misconfigured: {_0}")]
    Configuration(#[error(not(source))] String),
    /// The source was reachable in principle but the fetch failed.
    #[display("failed to fetch flags from {_0}")]
    Fetch(#[error(not(source))] String),
    /// The source answered with something that isn't a valid envelope.
    #[display("malformed flag payload from {_0}")]
    Decode(#[error(not(source))] String),
    /// A fetched flag failed validation; the whole refresh was abandoned.
    #[display("failed to prepare snapshot")]
    Preparation,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// A preparation failure only clears up when the upstream data changes,
    /// so it is not considered retryable even though the next scheduled
    /// refresh will try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Decode(_))
    }

    /// Pick the cache-level kind for a failure reported by `source` (a source
    /// name, or the configured driver if selection itself failed).
    pub(crate) fn from_source(kind: &SourceErrorKind, source: &str) -> Self {
        match kind {
            k if k.is_configuration() => Self::Configuration(source.to_string()),
            SourceErrorKind::Decode | SourceErrorKind::TooLarge(_) => Self::Decode(source.to_string()),
            _ => Self::Fetch(source.to_string()),
        }
    }
}
