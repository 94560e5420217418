//! Differential session persistence.
//!
//! Application code reads and writes session fields through a [`Namespace`],
//! which records every mutation as an [`Operation`]. At the end of a request
//! the [`SessionBackend`] turns those operation logs into a minimal
//! `$set`/`$unset` update against the session document, instead of
//! rewriting the whole session.
//!
//! Session lifetime is adaptive: see [`LifetimePolicy`]. Expired and
//! destroyed sessions are removed by [`SessionBackend::collect`], usually
//! driven by a [`Collector`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use keepsake_session::SessionBackend;
//! use keepsake_store::MemoryDocumentStore;
//!
//! let backend = SessionBackend::new(Arc::new(MemoryDocumentStore::new()))
//!     .with_user_agent("Mozilla/5.0");
//!
//! let mut session = backend.begin("session-id");
//! session.namespace("cart").set("items", 3);
//! backend.finish(&session);
//! ```

mod backend;
mod collector;
mod diff;
mod error;
mod host;
mod lifetime;
mod namespace;
mod operation;
mod sink;
mod state;

pub use backend::SessionBackend;
pub use collector::{Collector, CollectorConfig, CollectorStats};
pub use diff::diff;
pub use error::{Error, Result};
pub use host::StoreHost;
pub use lifetime::{
    BOT_LIFETIME_SECS, DEFAULT_BOT_PATTERN, LifetimePolicy, MAX_LIFETIME_SECS, READ_FACTOR_SECS,
    calculate_lifetime,
};
pub use namespace::Namespace;
pub use operation::{OPERATIONS_KEY, Operation, RESET_KEY};
pub use sink::{FailureSink, TracingSink};
pub use state::{SessionHost, SessionState};
