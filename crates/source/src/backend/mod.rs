//! Flag source trait and implementations.
//!
//! This module defines the [`FlagSource`] trait, which provides a unified
//! interface for pulling the full flag dataset out of a backend (a database,
//! a local file, an HTTP endpoint, an S3-compatible bucket).

mod database;
mod file;
mod http;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::database::DatabaseSource;
pub use self::file::FileSource;
pub use self::http::HttpSource;
#[cfg(feature = "mock")]
pub use self::mock::MockSource;
#[cfg(feature = "s3")]
pub use self::s3::S3Source;
use crate::error::Result;
use async_trait::async_trait;
use flagcache_entity::Flag;

/// Unified interface for flag sources.
///
/// A source has exactly one job: return every flag it knows about, or fail.
/// Sources never touch the cache themselves, so a failed fetch has no side
/// effects. Retrying is the caller's business.
///
/// # Examples
///
/// ```
/// use flagcache_source::{backend::FlagSource, error::Result};
///
/// async fn count_flags(source: &dyn FlagSource) -> Result<usize> {
///     let flags = source.fetch().await?;
///     tracing::info!(source = source.name(), flags = flags.len(), "Fetched flags");
///     Ok(flags.len())
/// }
/// ```
#[async_trait]
pub trait FlagSource: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// Fetch the complete flag dataset, with nested segments, constraints,
    /// distributions and variants populated.
    async fn fetch(&self) -> Result<Vec<Flag>>;
}
