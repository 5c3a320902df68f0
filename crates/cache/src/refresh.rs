//! Periodic background refresh.

use crate::cache::EvalCache;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Keeps an [`EvalCache`] up to date on a fixed interval.
///
/// Refreshes run one after another on a single task, so two refreshes never
/// overlap. A failed refresh is logged and retried on the next tick; the
/// cache keeps serving whatever it had.
pub struct Refresher {
    cache: Arc<EvalCache>,
    interval: Duration,
}
impl Refresher {
    /// # Panics
    /// Panics if `interval` is zero.
    pub fn new(cache: Arc<EvalCache>, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "refresh interval must be non-zero");
        Self { cache, interval }
    }

    /// Refresh once, then keep refreshing in the background until `token` is
    /// cancelled.
    ///
    /// The first refresh happens before this returns and its error, if any,
    /// is handed back; nothing is spawned in that case. A refresh that is in
    /// flight when the token is cancelled is abandoned.
    pub async fn start(self, token: CancellationToken) -> Result<JoinHandle<()>> {
        let stats = self.cache.refresh().await?;
        tracing::info!(
            generation = stats.generation,
            flags = stats.fetched,
            interval_ms = self.interval.as_millis() as u64,
            "Initial refresh complete; refreshing in the background"
        );
        Ok(tokio::spawn(self.run(token)))
    }

    #[instrument(name = "refresher", skip_all)]
    async fn run(self, token: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {},
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                result = self.cache.refresh() => match result {
                    Ok(stats) => tracing::debug!(
                        generation = stats.generation,
                        flags = stats.fetched,
                        elapsed_ms = stats.elapsed.as_millis() as u64,
                        "Refreshed flags"
                    ),
                    Err(err) => tracing::error!(
                        error = ?err,
                        retryable = err.is_retryable(),
                        "Refresh failed; keeping the current snapshot"
                    ),
                },
            }
        }
        tracing::debug!("Refresher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use flagcache_source::SourceSettings;
    use std::path::Path;

    const INTERVAL: Duration = Duration::from_millis(20);

    fn cache_for(path: &Path) -> Arc<EvalCache> {
        Arc::new(EvalCache::new(SourceSettings {
            eval_only_mode: true,
            driver: "json_file".to_string(),
            connection: path.display().to_string(),
            timeout: Duration::from_secs(1),
        }))
    }

    /// Poll until `condition` holds, giving up after a few seconds.
    async fn eventually(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(INTERVAL).await;
        }
        condition()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_start_refreshes_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        std::fs::write(&path, r#"{"Flags": [{"ID": 1, "Key": "a"}]}"#).unwrap();
        let cache = cache_for(&path);
        let token = CancellationToken::new();

        let handle = Refresher::new(Arc::clone(&cache), INTERVAL).start(token.clone()).await.unwrap();
        // Populated before `start` returns.
        assert_eq!(cache.lookup_by_key("a").unwrap().id(), 1);

        std::fs::write(&path, r#"{"Flags": [{"ID": 2, "Key": "b"}]}"#).unwrap();
        assert!(eventually(|| cache.lookup_by_key("b").is_some()).await);
        assert!(cache.lookup_by_key("a").is_none());

        token.cancel();
        handle.await.unwrap();
        let generation = cache.snapshot().unwrap().generation();
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(cache.snapshot().unwrap().generation(), generation);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_background_failures_keep_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        std::fs::write(&path, r#"{"Flags": [{"ID": 1, "Key": "a"}]}"#).unwrap();
        let cache = cache_for(&path);
        let token = CancellationToken::new();
        let handle = Refresher::new(Arc::clone(&cache), INTERVAL).start(token.clone()).await.unwrap();

        std::fs::write(&path, "not json").unwrap();
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(cache.lookup_by_id(1).unwrap().key(), "a");
        assert_eq!(cache.snapshot().unwrap().generation(), 1);

        // And it recovers once the source does.
        std::fs::write(&path, r#"{"Flags": [{"ID": 1, "Key": "renamed"}]}"#).unwrap();
        assert!(eventually(|| cache.lookup_by_key("renamed").is_some()).await);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_initial_failure_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_for(&dir.path().join("missing.json"));
        let err = Refresher::new(Arc::clone(&cache), INTERVAL).start(CancellationToken::new()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Fetch("json_file".to_string()));
        assert!(!cache.is_populated());
    }

    #[test]
    #[should_panic(expected = "refresh interval must be non-zero")]
    fn test_zero_interval_panics() {
        let dir = tempfile::tempdir().unwrap();
        Refresher::new(cache_for(&dir.path().join("flags.json")), Duration::ZERO);
    }
}
