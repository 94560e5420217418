//! Operation-tracking view over one session namespace.

use serde_json::{Map, Value};
use tracing::warn;

use crate::operation::{OPERATIONS_KEY, Operation, RESET_KEY, is_reserved};

/// Fields of one namespace plus the log of every mutation made to them in
/// the current request.
///
/// The log is append-only and never compacted: contradictory records for
/// the same key are kept in call order, and the persistence layer resolves
/// them last-write-wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    name: String,
    fields: Map<String, Value>,
    operations: Vec<Operation>,
    /// The stored value was replaced because it was not an object.
    replaced: bool,
}

impl Namespace {
    /// Materialize a namespace from its stored value.
    ///
    /// A null or non-object value is replaced by an empty namespace, and the
    /// snapshot then asks for the whole namespace to be rewritten. Stray
    /// reserved keys inside stored data are dropped.
    pub(crate) fn materialize(name: impl Into<String>, stored: Option<Value>) -> Self {
        let name = name.into();
        let (mut fields, replaced) = match stored {
            Some(Value::Object(map)) => (map, false),
            None => (Map::new(), false),
            Some(Value::Null) => (Map::new(), true),
            Some(other) => {
                warn!(namespace = %name, value = %other, "Replacing non-object namespace value");
                (Map::new(), true)
            }
        };
        fields.retain(|key, _| !is_reserved(key));

        Self {
            name,
            fields,
            operations: Vec::new(),
            replaced,
        }
    }

    /// Namespace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value of `key`, or `None` if unset.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Current value of `key`, then unset it.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        let value = self.get(key).cloned();
        self.unset(key);
        value
    }

    /// Set one field and record it.
    ///
    /// Reserved snapshot keys cannot be set; such calls are ignored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        if is_reserved(&key) {
            warn!(namespace = %self.name, key = %key, "Ignoring write to reserved key");
            return self;
        }

        let value = value.into();
        self.fields.insert(key.clone(), value.clone());
        self.operations.push(Operation::Set { key, value });
        self
    }

    /// Set several fields, recording one operation per key in iteration order.
    pub fn set_many<I, K, V>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
        self
    }

    /// Unset one field, leaving a null tombstone.
    ///
    /// Recorded whether or not the field existed.
    pub fn unset(&mut self, key: impl Into<String>) -> &mut Self {
        let key = key.into();
        if is_reserved(&key) {
            warn!(namespace = %self.name, key = %key, "Ignoring unset of reserved key");
            return self;
        }

        self.fields.insert(key.clone(), Value::Null);
        self.operations.push(Operation::Unset { key });
        self
    }

    /// Unset every field present in the namespace.
    pub fn unset_all(&mut self) -> &mut Self {
        let keys: Vec<String> = self
            .fields
            .keys()
            .filter(|k| !is_reserved(k))
            .cloned()
            .collect();

        for key in keys {
            self.fields.remove(&key);
            self.operations.push(Operation::Unset { key });
        }
        self
    }

    /// Keys with a non-null value.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, _)| k.as_str())
    }

    /// Mutations recorded so far, oldest first.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Whether the stored value was discarded for not being an object.
    pub fn replaced(&self) -> bool {
        self.replaced
    }

    /// Snapshot form: the fields plus the operation log under
    /// [`OPERATIONS_KEY`], and [`RESET_KEY`] if the stored value was replaced.
    pub fn to_snapshot(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert(
            OPERATIONS_KEY.to_string(),
            Value::Array(self.operations.iter().map(Operation::to_value).collect()),
        );
        if self.replaced {
            map.insert(RESET_KEY.to_string(), Value::Bool(true));
        }
        Value::Object(map)
    }
}
