//! Periodic garbage collection of expired sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use keepsake_store::DocumentStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::SessionBackend;
use crate::error::{Error, Result};

/// Default interval between collection passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Default retention of destroyed sessions (one hour).
pub const DEFAULT_MAX_LIFETIME_SECS: i64 = 3600;

/// Configuration for the [`Collector`].
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Time between passes. The first pass runs immediately.
    pub interval: Duration,

    /// Passed to [`SessionBackend::collect`]: how long destroyed sessions
    /// are retained.
    pub max_lifetime_secs: i64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_lifetime_secs: DEFAULT_MAX_LIFETIME_SECS,
        }
    }
}

impl CollectorConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_lifetime(mut self, secs: i64) -> Self {
        self.max_lifetime_secs = secs;
        self
    }
}

/// Counters for collection passes.
#[derive(Debug, Default)]
pub struct CollectorStats {
    passes: AtomicU64,
    failures: AtomicU64,
    deleted: AtomicU64,
}

impl CollectorStats {
    /// Completed passes, failed or not.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Sessions deleted across all passes.
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }
}

/// Runs [`SessionBackend::collect`] on a fixed interval.
///
/// A failed pass is reported through the backend's failure sink and retried
/// on the next tick. Store calls run on the blocking thread pool.
pub struct Collector<S: DocumentStore + ?Sized + 'static> {
    backend: Arc<SessionBackend<S>>,
    config: CollectorConfig,
    stats: Arc<CollectorStats>,
}

impl<S: DocumentStore + ?Sized + 'static> Collector<S> {
    pub fn new(backend: Arc<SessionBackend<S>>, config: CollectorConfig) -> Self {
        Self {
            backend,
            config,
            stats: Arc::new(CollectorStats::default()),
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Shared handle to the pass counters.
    pub fn stats(&self) -> Arc<CollectorStats> {
        Arc::clone(&self.stats)
    }

    /// Run one collection pass. Returns the number of deleted sessions, or
    /// `None` if the pass failed.
    pub async fn run_once(&self) -> Option<u64> {
        let result = self.collect_blocking().await;
        self.stats.passes.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(Some(deleted)) => {
                self.stats.deleted.fetch_add(deleted, Ordering::Relaxed);
                if deleted > 0 {
                    info!(deleted, "Collected expired sessions");
                } else {
                    debug!("No expired sessions");
                }
                Some(deleted)
            }
            Ok(None) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Collection pass aborted");
                None
            }
        }
    }

    async fn collect_blocking(&self) -> Result<Option<u64>> {
        let backend = Arc::clone(&self.backend);
        let max_lifetime_secs = self.config.max_lifetime_secs;

        tokio::task::spawn_blocking(move || backend.collect_counted(max_lifetime_secs))
            .await
            .map_err(|e| Error::Task(e.to_string()))
    }

    /// Run passes until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            max_lifetime_secs = self.config.max_lifetime_secs,
            "Session collector started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }

        info!(
            passes = self.stats.passes(),
            failures = self.stats.failures(),
            deleted = self.stats.deleted(),
            "Session collector stopped"
        );
    }

    /// Spawn [`run`](Self::run) onto the current runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use keepsake_store::{
        DeleteResult, Filter, FindOneAndUpdateOptions, MemoryDocumentStore, SessionDocument,
        Update, UpdateOptions, UpdateResult,
    };

    /// Answers every call but never acknowledges a delete.
    struct UnacknowledgedStore;

    impl DocumentStore for UnacknowledgedStore {
        fn find_one_and_update(
            &self,
            _id: &str,
            _update: &Update,
            _options: FindOneAndUpdateOptions,
        ) -> keepsake_store::Result<Option<SessionDocument>> {
            Ok(None)
        }

        fn update_one(
            &self,
            _id: &str,
            _update: &Update,
            _options: UpdateOptions,
        ) -> keepsake_store::Result<UpdateResult> {
            Ok(UpdateResult::default())
        }

        fn delete_many(&self, _filter: &Filter) -> keepsake_store::Result<DeleteResult> {
            Ok(DeleteResult {
                acknowledged: false,
                deleted_count: 0,
            })
        }

        fn find_one(&self, _id: &str) -> keepsake_store::Result<Option<SessionDocument>> {
            Ok(None)
        }

        fn count(&self) -> keepsake_store::Result<u64> {
            Ok(0)
        }
    }

    fn backend_with_expired(count: usize) -> Arc<SessionBackend<MemoryDocumentStore>> {
        let store = MemoryDocumentStore::new();
        for i in 0..count {
            let mut doc = SessionDocument::new(format!("expired-{i}"));
            doc.last_read_at = Utc::now() - ChronoDuration::seconds(3600);
            doc.lifetime = Some(30);
            store.insert(doc);
        }
        let mut live = SessionDocument::new("live");
        live.last_read_at = Utc::now();
        live.lifetime = Some(3600);
        store.insert(live);

        Arc::new(SessionBackend::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_run_once_counts() {
        let backend = backend_with_expired(3);
        let collector = Collector::new(Arc::clone(&backend), CollectorConfig::default());

        assert_eq!(collector.run_once().await, Some(3));
        assert_eq!(collector.run_once().await, Some(0));

        let stats = collector.stats();
        assert_eq!(stats.passes(), 2);
        assert_eq!(stats.deleted(), 3);
        assert_eq!(stats.failures(), 0);
        assert_eq!(backend.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unacknowledged_pass_counts_as_failure() {
        let backend = Arc::new(SessionBackend::new(Arc::new(UnacknowledgedStore)));
        let collector = Collector::new(backend, CollectorConfig::default());

        assert_eq!(collector.run_once().await, None);

        let stats = collector.stats();
        assert_eq!(stats.passes(), 1);
        assert_eq!(stats.failures(), 1);
        assert_eq!(stats.deleted(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let backend = backend_with_expired(2);
        let collector = Collector::new(
            Arc::clone(&backend),
            CollectorConfig::default().with_interval(Duration::from_millis(10)),
        );
        let stats = collector.stats();
        let cancel = CancellationToken::new();

        let handle = collector.spawn(cancel.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(stats.passes() >= 1);
        assert_eq!(stats.deleted(), 2);
        assert!(backend.store().find_one("live").unwrap().is_some());
    }

    #[test]
    fn test_config_builders() {
        let config = CollectorConfig::default()
            .with_interval(Duration::from_secs(60))
            .with_max_lifetime(120);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.max_lifetime_secs, 120);
    }
}
