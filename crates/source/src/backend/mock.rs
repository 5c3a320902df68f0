//! In-memory flag source for testing.

use crate::backend::FlagSource;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use flagcache_entity::Flag;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory flag source for testing.
///
/// Serves whatever it was last told to: a list of flags, or a network
/// failure. The response can be swapped between fetches to simulate an
/// upstream that changes (or goes away) between refreshes.
///
/// # Examples
///
/// ```
/// use flagcache_entity::Flag;
/// use flagcache_source::backend::{FlagSource, MockSource};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = MockSource::with_flags([Flag { id: 1, ..Default::default() }]);
/// assert_eq!(source.fetch().await.unwrap().len(), 1);
///
/// source.fail_with("connection reset").await;
/// assert!(source.fetch().await.is_err());
/// assert_eq!(source.fetch_count(), 2);
/// # }
/// ```
pub struct MockSource {
    name: String,
    response: RwLock<std::result::Result<Vec<Flag>, String>>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}
impl MockSource {
    pub fn with_flags(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self {
            name: "mock".to_string(),
            response: RwLock::new(Ok(flags.into_iter().collect())),
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source that fails every fetch until told otherwise.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { response: RwLock::new(Err(message.into())), ..Self::default() }
    }

    /// Change the name of the mock source.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sleep this long at the start of every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn set_flags(&self, flags: impl IntoIterator<Item = Flag>) {
        *self.response.write().await = Ok(flags.into_iter().collect());
    }

    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.response.write().await = Err(message.into());
    }

    /// How many times `fetch()` has been called.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}
impl Default for MockSource {
    fn default() -> Self {
        Self::with_flags([])
    }
}

#[async_trait]
impl FlagSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Flag>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &*self.response.read().await {
            Ok(flags) => Ok(flags.clone()),
            Err(message) => exn::bail!(ErrorKind::Network(message.clone())),
        }
    }
}
