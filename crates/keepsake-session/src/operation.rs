//! Tracked session mutations.

use serde::Deserialize;
use serde_json::{Value, json};

/// Key under which a namespace snapshot carries its operation log.
pub const OPERATIONS_KEY: &str = "__operations";

/// Snapshot flag: the stored namespace value was not an object and the whole
/// namespace must be rewritten.
pub const RESET_KEY: &str = "__reset";

/// Whether `key` is used by snapshots and cannot hold namespace data.
pub fn is_reserved(key: &str) -> bool {
    key == OPERATIONS_KEY || key == RESET_KEY
}

/// One recorded mutation of a namespace field.
///
/// In a snapshot each record is an object `{"type", "key", "value"}`;
/// `unset` records carry a null value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Set { key: String, value: Value },
    Unset { key: String },
}

impl Operation {
    pub fn set(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Operation::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn unset(key: impl Into<String>) -> Self {
        Operation::Unset { key: key.into() }
    }

    /// The field this operation touches.
    pub fn key(&self) -> &str {
        match self {
            Operation::Set { key, .. } | Operation::Unset { key } => key,
        }
    }

    /// Snapshot form of the record.
    pub fn to_value(&self) -> Value {
        match self {
            Operation::Set { key, value } => json!({ "type": "set", "key": key, "value": value }),
            Operation::Unset { key } => json!({ "type": "unset", "key": key, "value": null }),
        }
    }

    /// Parse a snapshot record, or `None` if it is malformed.
    pub fn from_value(value: &Value) -> Option<Self> {
        Operation::deserialize(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_form() {
        assert_eq!(
            Operation::set("color", "red").to_value(),
            json!({ "type": "set", "key": "color", "value": "red" })
        );
        assert_eq!(
            Operation::unset("color").to_value(),
            json!({ "type": "unset", "key": "color", "value": null })
        );
    }

    #[test]
    fn test_parse_records() {
        let set = json!({ "type": "set", "key": "k", "value": { "nested": [1, 2] } });
        assert_eq!(
            Operation::from_value(&set),
            Some(Operation::set("k", json!({ "nested": [1, 2] })))
        );

        let unset = json!({ "type": "unset", "key": "k" });
        assert_eq!(Operation::from_value(&unset), Some(Operation::unset("k")));

        let null_set = json!({ "type": "set", "key": "k", "value": null });
        assert_eq!(
            Operation::from_value(&null_set),
            Some(Operation::set("k", Value::Null))
        );
    }

    #[test]
    fn test_malformed_records_are_rejected() {
        for bad in [
            json!({ "type": "set", "key": "k" }),
            json!({ "type": "set", "value": 1 }),
            json!({ "type": "rename", "key": "k" }),
            json!({ "type": "unset", "key": 7 }),
            json!("set k"),
            json!(null),
        ] {
            assert_eq!(Operation::from_value(&bad), None, "accepted {bad}");
        }
    }
}
