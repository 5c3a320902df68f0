//! Local file source (`json_file` driver).

use crate::envelope::Envelope;
use crate::error::{ErrorKind, Result};
use crate::backend::FlagSource;
use async_trait::async_trait;
use flagcache_entity::Flag;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tracing::instrument;

/// Reads an envelope from a JSON file on the local filesystem.
///
/// The file is re-opened on every fetch so edits are picked up by the next
/// refresh.
///
/// # Examples
///
/// ```no_run
/// use flagcache_source::backend::{FileSource, FlagSource};
///
/// # async fn example() -> flagcache_source::error::Result<()> {
/// let source = FileSource::new("/etc/flagcache/flags.json");
/// let flags = source.fetch().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}
impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FlagSource for FileSource {
    fn name(&self) -> &str {
        "json_file"
    }

    #[instrument(name = "fetch_file", skip(self), fields(path = %self.path.display()))]
    async fn fetch(&self) -> Result<Vec<Flag>> {
        let file = File::open(&self.path).await.map_err(|e| ErrorKind::map_io_error(e, &self.path))?;
        let envelope = Envelope::read(file).await?;
        tracing::debug!(flags = envelope.flags.len(), "Read envelope from file");
        Ok(envelope.into_flags())
    }
}
