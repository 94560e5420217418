//! Differential persistence of session state.

use std::sync::Arc;

use chrono::Utc;
use keepsake_store::{
    DocumentStore, Filter, FindOneAndUpdateOptions, Update, UpdateOptions, timestamp_value,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::diff::diff;
use crate::error::{Error, Result};
use crate::host::StoreHost;
use crate::lifetime::LifetimePolicy;
use crate::sink::{FailureSink, TracingSink};
use crate::state::{SessionHost, SessionState};

/// Reads, writes, destroys and collects session documents.
///
/// One backend serves one request: `read` records the session's read count,
/// and the following `write` uses it to compute the adaptive lifetime.
/// Store failures never escape the public operations; they are reported to
/// the [`FailureSink`] and degrade to "empty session" or "not saved". The
/// `try_*` variants return them instead.
pub struct SessionBackend<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    policy: LifetimePolicy,
    sink: Arc<dyn FailureSink>,
    user_agent: String,
    reads: Mutex<Option<i64>>,
}

impl<S: DocumentStore + ?Sized> std::fmt::Debug for SessionBackend<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBackend")
            .field("policy", &self.policy)
            .field("user_agent", &self.user_agent)
            .field("reads", &*self.reads.lock())
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore + ?Sized> SessionBackend<S> {
    /// Create a backend over `store` with the default policy.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            policy: LifetimePolicy::default(),
            sink: Arc::new(TracingSink),
            user_agent: String::new(),
            reads: Mutex::new(None),
        }
    }

    /// Use a custom lifetime policy.
    pub fn with_policy(mut self, policy: LifetimePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report failures somewhere other than `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = sink;
        self
    }

    /// User agent of the client this request serves.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> &LifetimePolicy {
        &self.policy
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Read count recorded by the last read, if any.
    pub fn recorded_reads(&self) -> Option<i64> {
        *self.reads.lock()
    }

    /// Lifetime in seconds under this backend's policy.
    pub fn calculate_lifetime(&self, reads: i64, user_agent: &str) -> i64 {
        self.policy.calculate(reads, user_agent)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read
    // ─────────────────────────────────────────────────────────────────────

    /// Fetch the session's data, creating the document if it is missing.
    ///
    /// Destroyed sessions read as empty. On store failure the failure is
    /// reported and an empty mapping is returned.
    pub fn read(&self, session_id: &str) -> Map<String, Value> {
        self.try_read(session_id).unwrap_or_else(|e| {
            self.sink.log_failure("read", &e);
            Map::new()
        })
    }

    /// [`read`](Self::read), returning store failures.
    pub fn try_read(&self, session_id: &str) -> Result<Map<String, Value>> {
        let update = Update::new()
            .set("last_read_at", timestamp_value(Utc::now()))
            .inc("reads", 1);

        let doc = self.store.find_one_and_update(
            session_id,
            &update,
            FindOneAndUpdateOptions::upsert_returning_after(),
        )?;

        let Some(doc) = doc.filter(|doc| !doc.destroyed) else {
            debug!(session_id = %session_id, "Session destroyed or missing, reading as empty");
            *self.reads.lock() = Some(1);
            return Ok(Map::new());
        };

        debug!(session_id = %session_id, reads = doc.reads, "Session read");
        *self.reads.lock() = Some(doc.reads);
        Ok(doc.data)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Write
    // ─────────────────────────────────────────────────────────────────────

    /// Persist the tracked changes in `snapshot`.
    ///
    /// An empty snapshot succeeds without contacting the store. The update
    /// never creates a document, so a destroyed or collected session is not
    /// brought back. Returns whether the store acknowledged the write.
    pub fn write(&self, session_id: &str, snapshot: &Map<String, Value>) -> bool {
        self.try_write(session_id, snapshot).unwrap_or_else(|e| {
            self.sink.log_failure("write", &e);
            false
        })
    }

    /// [`write`](Self::write), returning store failures.
    pub fn try_write(&self, session_id: &str, snapshot: &Map<String, Value>) -> Result<bool> {
        if snapshot.is_empty() {
            return Ok(true);
        }

        let update = self.build_update(snapshot);
        let result = self
            .store
            .update_one(session_id, &update, UpdateOptions { upsert: false })?;

        if result.matched_count == 0 {
            debug!(session_id = %session_id, "No session document to write, not recreating");
        } else {
            debug!(
                session_id = %session_id,
                set = update.set.len(),
                unset = update.unset.len(),
                "Session written"
            );
        }
        Ok(result.acknowledged)
    }

    /// The full update `write` would issue for `snapshot`.
    pub fn build_update(&self, snapshot: &Map<String, Value>) -> Update {
        let reads = self.recorded_reads().unwrap_or(0);
        let lifetime = self.policy.calculate(reads, &self.user_agent);

        diff(snapshot)
            .set("updated_at", timestamp_value(Utc::now()))
            .set("lifetime", lifetime)
            .set("user_agent", self.user_agent.as_str())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Destroy
    // ─────────────────────────────────────────────────────────────────────

    /// Mark the session destroyed. The document stays until collected.
    pub fn destroy(&self, session_id: &str) -> bool {
        self.try_destroy(session_id).unwrap_or_else(|e| {
            self.sink.log_failure("destroy", &e);
            false
        })
    }

    /// [`destroy`](Self::destroy), returning store failures.
    pub fn try_destroy(&self, session_id: &str) -> Result<bool> {
        let update = Update::new()
            .set("_destroyed", true)
            .set("destroyed_at", timestamp_value(Utc::now()));

        let result = self
            .store
            .update_one(session_id, &update, UpdateOptions { upsert: false })?;

        debug!(session_id = %session_id, matched = result.matched_count, "Session destroyed");
        Ok(result.acknowledged)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Garbage collection
    // ─────────────────────────────────────────────────────────────────────

    /// Delete sessions past their retention window.
    ///
    /// Destroyed sessions are kept for `max_lifetime_secs` after being
    /// destroyed; live sessions expire by their own persisted lifetime.
    pub fn collect(&self, max_lifetime_secs: i64) -> bool {
        self.collect_counted(max_lifetime_secs).is_some()
    }

    /// [`collect`](Self::collect), returning the number of deleted sessions,
    /// or `None` on failure.
    pub fn collect_counted(&self, max_lifetime_secs: i64) -> Option<u64> {
        match self.try_collect(max_lifetime_secs) {
            Ok(deleted) => Some(deleted),
            Err(e) => {
                self.sink.log_failure("collect", &e);
                None
            }
        }
    }

    /// [`collect`](Self::collect), returning store failures.
    pub fn try_collect(&self, max_lifetime_secs: i64) -> Result<u64> {
        let filter = Filter::expired(
            Utc::now(),
            max_lifetime_secs,
            self.policy.unwritten_lifetime_secs(),
        );
        let result = self.store.delete_many(&filter)?;

        if !result.acknowledged {
            return Err(Error::Unacknowledged("collect"));
        }

        debug!(deleted = result.deleted_count, "Session collection pass complete");
        Ok(result.deleted_count)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Request lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Session state for `session_id`, read from this backend on first use.
    pub fn begin(&self, session_id: impl Into<String>) -> SessionState<StoreHost<'_, S>> {
        SessionState::new(StoreHost::new(self, session_id))
    }

    /// Persist the changes tracked in `state`.
    pub fn finish<H: SessionHost>(&self, state: &SessionState<H>) -> bool {
        match state.host().session_id() {
            Some(session_id) => self.write(session_id, &state.snapshot()),
            None => !state.is_active(),
        }
    }
}
