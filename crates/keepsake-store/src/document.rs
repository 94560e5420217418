//! The persisted session document.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// One session, as stored.
///
/// The serialized field names are shared by every process pointing at the
/// same store and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    /// Opaque session identifier.
    #[serde(rename = "_id")]
    pub id: String,

    /// Namespace name to namespace value.
    #[serde(default)]
    pub data: Map<String, Value>,

    /// Number of reads so far, incremented once per read.
    #[serde(default)]
    pub reads: i64,

    /// Set on every read.
    #[serde(default = "unix_epoch")]
    pub last_read_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroyed_at: Option<DateTime<Utc>>,

    /// Last computed lifetime in seconds, used by garbage collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<i64>,

    /// Last observed client user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Logically deleted; kept until garbage collection removes it.
    #[serde(rename = "_destroyed", default, skip_serializing_if = "is_false")]
    pub destroyed: bool,
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl SessionDocument {
    /// Create an empty document for the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: Map::new(),
            reads: 0,
            last_read_at: unix_epoch(),
            updated_at: None,
            destroyed_at: None,
            lifetime: None,
            user_agent: None,
            destroyed: false,
        }
    }

    /// Convert to the JSON object form that updates are applied to.
    pub fn into_map(self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::InvalidDocument(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Rebuild a document from its JSON object form.
    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// Destroyed, and destroyed strictly before `cutoff`.
    pub fn destroyed_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.destroyed && self.destroyed_at.is_some_and(|at| at < cutoff)
    }

    /// Not destroyed, and not read within its own persisted lifetime.
    ///
    /// Documents that were never written carry no lifetime and are judged
    /// against `fallback_lifetime_secs`.
    pub fn idle_beyond_lifetime(&self, now: DateTime<Utc>, fallback_lifetime_secs: i64) -> bool {
        if self.destroyed {
            return false;
        }
        let lifetime_ms = self
            .lifetime
            .unwrap_or(fallback_lifetime_secs)
            .saturating_mul(1000);
        self.last_read_at.timestamp_millis() < now.timestamp_millis().saturating_sub(lifetime_ms)
    }
}

/// Canonical JSON form of a timestamp inside update instructions.
pub fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
