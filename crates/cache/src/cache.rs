use crate::error::{ErrorKind, Result};
use crate::snapshot::Snapshot;
use arc_swap::ArcSwapOption;
use exn::ResultExt;
use flagcache_entity::PreparedFlag;
use flagcache_source::backend::FlagSource;
use flagcache_source::{Envelope, Selector, SourceSettings};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Outcome of a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub generation: u64,
    /// Flags returned by the source, indexable or not.
    pub fetched: usize,
    pub by_id: usize,
    pub by_key: usize,
    pub elapsed: Duration,
}

/// Serves prepared flags from the most recent successful refresh.
///
/// The cache is either empty (never refreshed successfully) or holds exactly
/// one [`Snapshot`]. A refresh fetches and prepares a complete new snapshot
/// off to the side and then swaps it in with a single atomic store; readers
/// never wait on a refresh and always see one whole generation. A refresh
/// that fails at any step leaves the current snapshot in place.
///
/// # Examples
///
/// ```no_run
/// use flagcache_cache::EvalCache;
/// use flagcache_source::SourceSettings;
/// use std::time::Duration;
///
/// # async fn example() -> flagcache_cache::error::Result<()> {
/// let cache = EvalCache::new(SourceSettings {
///     eval_only_mode: true,
///     driver: "json_file".to_string(),
///     connection: "/etc/flagcache/flags.json".to_string(),
///     timeout: Duration::from_secs(59),
/// });
/// cache.refresh().await?;
/// if let Some(flag) = cache.lookup_by_key("checkout") {
///     println!("checkout is {}", if flag.flag().enabled { "on" } else { "off" });
/// }
/// # Ok(())
/// # }
/// ```
pub struct EvalCache {
    selector: Selector,
    current: ArcSwapOption<Snapshot>,
    generation: AtomicU64,
}
impl EvalCache {
    pub fn new(settings: SourceSettings) -> Self {
        Self::with_selector(Selector::new(settings))
    }

    pub fn with_selector(selector: Selector) -> Self {
        Self { selector, current: ArcSwapOption::empty(), generation: AtomicU64::new(0) }
    }

    /// Fetch from the configured source and install the result.
    ///
    /// The source is selected anew on every call. If the returned future is
    /// dropped before it completes, nothing is installed.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshStats> {
        let source = match self.selector.select().await {
            Ok(source) => source,
            Err(e) => {
                let kind = ErrorKind::from_source(&e, &self.selector.settings().driver);
                return Err(e).or_raise(|| kind);
            },
        };
        self.refresh_from(source.as_ref()).await
    }

    /// Same as [`refresh`](Self::refresh), with an explicit source.
    #[instrument(skip_all, fields(source = source.name()))]
    pub async fn refresh_from(&self, source: &dyn FlagSource) -> Result<RefreshStats> {
        let started = Instant::now();
        let flags = match source.fetch().await {
            Ok(flags) => flags,
            Err(e) => {
                let kind = ErrorKind::from_source(&e, source.name());
                return Err(e).or_raise(|| kind);
            },
        };
        let fetched = flags.len();
        // Generations only ever increase; failed builds leave gaps.
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = Snapshot::build(flags, generation)?;
        let stats = RefreshStats {
            generation,
            fetched,
            by_id: snapshot.len_by_id(),
            by_key: snapshot.len_by_key(),
            elapsed: started.elapsed(),
        };
        self.current.store(Some(Arc::new(snapshot)));
        tracing::debug!(
            generation,
            flags = fetched,
            by_id = stats.by_id,
            by_key = stats.by_key,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Installed snapshot"
        );
        Ok(stats)
    }

    pub fn lookup_by_id(&self, id: u64) -> Option<Arc<PreparedFlag>> {
        let current = self.current.load();
        current.as_deref()?.by_id(id).cloned()
    }

    pub fn lookup_by_key(&self, key: &str) -> Option<Arc<PreparedFlag>> {
        let current = self.current.load();
        current.as_deref()?.by_key(key).cloned()
    }

    /// Copies of every flag reachable by ID, ready to be written out. Empty
    /// if the cache has never been refreshed.
    pub fn export(&self) -> Envelope {
        match self.current.load().as_deref() {
            Some(snapshot) => Envelope::new(snapshot.export()),
            None => Envelope::default(),
        }
    }

    /// The current snapshot, for callers that need several lookups against
    /// the same generation.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn is_populated(&self) -> bool {
        self.current.load().is_some()
    }
}
