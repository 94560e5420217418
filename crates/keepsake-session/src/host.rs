//! A host session backed directly by the persistence layer.

use keepsake_store::DocumentStore;
use serde_json::{Map, Value};

use crate::backend::SessionBackend;
use crate::state::SessionHost;

/// Host session whose start is a [`SessionBackend::read`].
///
/// For hosts with no native session machinery of their own: the session
/// identifier is supplied by the caller, and the user agent is the one the
/// backend was built with.
pub struct StoreHost<'b, S: DocumentStore + ?Sized> {
    backend: &'b SessionBackend<S>,
    session_id: String,
}

impl<'b, S: DocumentStore + ?Sized> StoreHost<'b, S> {
    pub fn new(backend: &'b SessionBackend<S>, session_id: impl Into<String>) -> Self {
        Self {
            backend,
            session_id: session_id.into(),
        }
    }
}

impl<S: DocumentStore + ?Sized> SessionHost for StoreHost<'_, S> {
    fn start(&mut self, _session_name: Option<&str>) -> Map<String, Value> {
        self.backend.read(&self.session_id)
    }

    fn session_id(&self) -> Option<&str> {
        Some(&self.session_id)
    }

    fn user_agent(&self) -> &str {
        self.backend.user_agent()
    }
}
