//! Backend selection.
//!
//! Which [`FlagSource`] serves a refresh is decided by two settings: whether
//! the process runs in evaluation-only mode, and the driver name. Outside
//! evaluation-only mode the flag database is the source of truth and the
//! driver names its SQL dialect; inside it, the driver picks one of the JSON
//! envelope transports and the connection string is its path, URL or object
//! location.

use crate::backend::{DatabaseSource, FileSource, FlagSource, HttpSource};
use crate::error::{Error, ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::instrument;

/// Shared handle to whichever source was selected.
pub type SourceHandle = Arc<dyn FlagSource>;

/// Everything the selector needs to know about the process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub eval_only_mode: bool,
    pub driver: String,
    pub connection: String,
    /// Upper bound for remote fetches (HTTP and object storage).
    pub timeout: Duration,
}

/// Envelope transports available in evaluation-only mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    JsonFile,
    JsonHttp,
    JsonS3,
}
impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonFile => "json_file",
            Self::JsonHttp => "json_http",
            Self::JsonS3 => "json_s3",
        }
    }
}
impl FromStr for Driver {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json_file" => Ok(Self::JsonFile),
            "json_http" => Ok(Self::JsonHttp),
            "json_s3" => Ok(Self::JsonS3),
            other => exn::bail!(ErrorKind::UnsupportedDriver(other.to_string())),
        }
    }
}
impl Display for Driver {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// SQL dialects the database source accepts, by their configured names.
const DATABASE_DRIVERS: &[&str] = &["sqlite3", "sqlite", "mysql", "postgres"];

/// Picks the flag source for each refresh.
///
/// Selection runs on every refresh, so the driver is always re-checked.
/// Sources that hold a connection pool or client (database, HTTP, object
/// storage) are built on first use and shared by every later selection;
/// a failed build is retried on the next one.
pub struct Selector {
    settings: SourceSettings,
    database: OnceCell<SourceHandle>,
    http: OnceCell<SourceHandle>,
    s3: OnceCell<SourceHandle>,
}
impl Selector {
    pub fn new(settings: SourceSettings) -> Self {
        Self { settings, database: OnceCell::new(), http: OnceCell::new(), s3: OnceCell::new() }
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    /// Resolve the configured source.
    ///
    /// Driver names are validated before any I/O, so an unsupported driver
    /// never results in a connection attempt.
    #[instrument(skip(self), fields(eval_only_mode = self.settings.eval_only_mode, driver = %self.settings.driver))]
    pub async fn select(&self) -> Result<SourceHandle> {
        let SourceSettings { eval_only_mode, driver, connection, timeout } = &self.settings;
        if !eval_only_mode {
            if !DATABASE_DRIVERS.contains(&driver.as_str()) {
                exn::bail!(ErrorKind::UnsupportedDriver(driver.clone()));
            }
            let source = self
                .database
                .get_or_try_init(|| async {
                    let source = DatabaseSource::connect(connection).await?;
                    Ok::<_, Error>(Arc::new(source) as SourceHandle)
                })
                .await?;
            return Ok(Arc::clone(source));
        }
        let source: SourceHandle = match driver.parse::<Driver>()? {
            Driver::JsonFile => Arc::new(FileSource::new(connection)),
            Driver::JsonHttp => {
                let source = self
                    .http
                    .get_or_try_init(|| async {
                        Ok::<_, Error>(Arc::new(HttpSource::new(connection.clone(), *timeout)?) as SourceHandle)
                    })
                    .await?;
                Arc::clone(source)
            },
            Driver::JsonS3 => {
                let source = self.s3.get_or_try_init(|| async { s3_source(connection, *timeout) }).await?;
                Arc::clone(source)
            },
        };
        Ok(source)
    }
}

#[cfg(feature = "s3")]
fn s3_source(connection: &str, timeout: Duration) -> Result<SourceHandle> {
    let location: crate::S3Location = connection.parse()?;
    Ok(Arc::new(crate::backend::S3Source::new(location, timeout)))
}

#[cfg(not(feature = "s3"))]
fn s3_source(_connection: &str, _timeout: Duration) -> Result<SourceHandle> {
    exn::bail!(ErrorKind::DisabledDriver(Driver::JsonS3.to_string()))
}
