//! Per-request session state.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::namespace::Namespace;

/// The host framework's side of a session.
///
/// The host owns session activation, identifiers and the client; this crate
/// never creates or parses session identifiers.
pub trait SessionHost {
    /// Activate the native session and return its stored contents.
    ///
    /// Called at most once per [`SessionState`].
    fn start(&mut self, session_name: Option<&str>) -> Map<String, Value>;

    /// Identifier of the current session, once known.
    fn session_id(&self) -> Option<&str>;

    /// User agent of the current client.
    fn user_agent(&self) -> &str;
}

/// Session contents for one request.
///
/// Starts inactive. The first namespace access (or an explicit
/// [`start`](Self::start)) activates the host session and materializes its
/// data; later calls reuse it.
#[derive(Debug)]
pub struct SessionState<H> {
    host: H,
    data: Option<Map<String, Value>>,
    namespaces: BTreeMap<String, Namespace>,
}

impl<H: SessionHost> SessionState<H> {
    /// Wrap a host session. Nothing is read until first use.
    pub fn new(host: H) -> Self {
        Self {
            host,
            data: None,
            namespaces: BTreeMap::new(),
        }
    }

    /// Whether the host session has been started.
    pub fn is_active(&self) -> bool {
        self.data.is_some()
    }

    /// Start the host session if it is not active yet.
    pub fn start(&mut self, session_name: Option<&str>) -> &mut Self {
        if self.data.is_none() {
            let data = self.host.start(session_name);
            debug!(
                session_id = self.host.session_id().unwrap_or("-"),
                namespaces = data.len(),
                "Session started"
            );
            self.data = Some(data);
        }
        self
    }

    /// The tracker for `name`, initializing it on first use.
    pub fn namespace(&mut self, name: &str) -> &mut Namespace {
        self.init(name, None)
    }

    /// Bind a tracker to `name`, starting the host session with
    /// `session_name` if it is not active yet.
    ///
    /// Idempotent: later calls return the same tracker with its log intact.
    pub fn init(&mut self, name: &str, session_name: Option<&str>) -> &mut Namespace {
        self.start(session_name);

        let data = &mut self.data;
        self.namespaces.entry(name.to_string()).or_insert_with(|| {
            let stored = data.as_mut().and_then(|data| data.remove(name));
            Namespace::materialize(name, stored)
        })
    }

    /// Write top-level session data outside any namespace.
    ///
    /// Direct keys start with `_` and are persisted whole on every write.
    pub fn set_direct(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        if !key.starts_with('_') {
            return Err(Error::InvalidDirectKey(key.to_string()));
        }
        self.start(None);
        if let Some(data) = self.data.as_mut() {
            data.insert(key.to_string(), value.into());
        }
        Ok(())
    }

    /// Read top-level session data outside any namespace.
    pub fn get_direct(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(key))
    }

    /// The snapshot collection handed to the persistence layer.
    ///
    /// Contains the untouched stored values as loaded, plus every tracked
    /// namespace with its operation log. Empty if the session never started.
    pub fn snapshot(&self) -> Map<String, Value> {
        let mut snapshot = self.data.clone().unwrap_or_default();
        for (name, namespace) in &self.namespaces {
            snapshot.insert(name.clone(), namespace.to_snapshot());
        }
        snapshot
    }

    /// The host session.
    pub fn host(&self) -> &H {
        &self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::operation::{OPERATIONS_KEY, Operation};

    #[derive(Debug, Default)]
    struct FakeHost {
        stored: Map<String, Value>,
        starts: usize,
        last_name: Option<String>,
    }

    impl SessionHost for FakeHost {
        fn start(&mut self, session_name: Option<&str>) -> Map<String, Value> {
            self.starts += 1;
            self.last_name = session_name.map(String::from);
            self.stored.clone()
        }

        fn session_id(&self) -> Option<&str> {
            Some("fake")
        }

        fn user_agent(&self) -> &str {
            "test-agent"
        }
    }

    fn host_with(stored: Value) -> FakeHost {
        FakeHost {
            stored: stored.as_object().cloned().unwrap_or_default(),
            ..FakeHost::default()
        }
    }

    #[test]
    fn test_inactive_until_first_touch() {
        let state = SessionState::new(FakeHost::default());
        assert!(!state.is_active());
        assert_eq!(state.host().starts, 0);
        assert!(state.snapshot().is_empty());
    }

    #[test]
    fn test_namespace_lazily_starts_once() {
        let mut state = SessionState::new(host_with(json!({ "cart": { "items": 2 } })));

        assert_eq!(state.namespace("cart").get("items"), Some(&json!(2)));
        state.namespace("user");
        state.init("cart", Some("ignored"));

        assert!(state.is_active());
        assert_eq!(state.host().starts, 1);
        assert_eq!(state.host().last_name, None);
    }

    #[test]
    fn test_init_passes_session_name() {
        let mut state = SessionState::new(FakeHost::default());
        state.init("cart", Some("FRONTEND"));
        assert_eq!(state.host().last_name.as_deref(), Some("FRONTEND"));
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut state = SessionState::new(FakeHost::default());
        state.namespace("cart").set("items", 1);
        state.init("cart", None).set("items", 2);

        assert_eq!(
            state.namespace("cart").operations(),
            &[Operation::set("items", 1), Operation::set("items", 2)]
        );
    }

    #[test]
    fn test_snapshot_merges_tracked_and_untouched() {
        let mut state = SessionState::new(host_with(json!({
            "cart": { "items": 2 },
            "user": { "name": "ada" },
            "_flash": "saved"
        })));
        state.namespace("cart").set("items", 3);

        let snapshot = state.snapshot();
        assert_eq!(snapshot["user"], json!({ "name": "ada" }));
        assert_eq!(snapshot["_flash"], json!("saved"));
        assert_eq!(snapshot["cart"]["items"], json!(3));
        assert_eq!(
            snapshot["cart"][OPERATIONS_KEY],
            json!([{ "type": "set", "key": "items", "value": 3 }])
        );
    }

    #[test]
    fn test_direct_keys() {
        let mut state = SessionState::new(FakeHost::default());
        state.set_direct("_locale", "en").unwrap();
        assert_eq!(state.get_direct("_locale"), Some(&json!("en")));
        assert!(state.is_active());

        let err = state.set_direct("locale", "en").unwrap_err();
        assert!(matches!(err, Error::InvalidDirectKey(_)));
    }
}
