//! Turning operation logs into store update instructions.

use keepsake_store::Update;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::operation::{OPERATIONS_KEY, Operation, RESET_KEY, is_reserved};

/// Build `$set`/`$unset` instructions from a session snapshot.
///
/// - Keys starting with `_` are direct data: the whole value is set at
///   `data.<key>`, and any operation log it carries is ignored.
/// - Other keys are namespaces. A namespace without an operation log
///   contributes nothing. A namespace flagged with [`RESET_KEY`] replaced a
///   non-object stored value and, once modified, is set whole at
///   `data.<namespace>`.
/// - Names and keys that would produce an empty path segment are skipped.
/// - Log records are applied in order at `data.<namespace>.<key>`. A set
///   replaces any earlier set; an unset drops any earlier set for the path.
///   The last record for a path decides its treatment.
/// - Malformed records are skipped; the rest of the log still applies.
///
/// Pure function of its input.
pub fn diff(snapshot: &Map<String, Value>) -> Update {
    let mut update = Update::new();

    for (namespace, value) in snapshot {
        if namespace.starts_with('_') {
            update.set.insert(format!("data.{namespace}"), value.clone());
            continue;
        }

        if has_empty_segment(namespace) {
            warn!(namespace = %namespace, "Skipping namespace with an unaddressable name");
            continue;
        }

        if let Some(ns) = value.as_object()
            && ns.get(RESET_KEY) == Some(&Value::Bool(true))
        {
            let changed = ns
                .get(OPERATIONS_KEY)
                .and_then(Value::as_array)
                .is_some_and(|records| !records.is_empty());
            if !changed {
                trace!(namespace = %namespace, "Replaced namespace was not modified, skipping");
                continue;
            }
            let fields: Map<String, Value> = ns
                .iter()
                .filter(|(key, value)| !is_reserved(key) && !value.is_null())
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            update.set.insert(format!("data.{namespace}"), Value::Object(fields));
            continue;
        }

        let Some(log) = value.as_object().and_then(|ns| ns.get(OPERATIONS_KEY)) else {
            trace!(namespace = %namespace, "No operation log, skipping namespace");
            continue;
        };
        let Some(records) = log.as_array() else {
            warn!(namespace = %namespace, "Operation log is not a list, skipping namespace");
            continue;
        };

        for record in records {
            let Some(operation) = Operation::from_value(record) else {
                warn!(namespace = %namespace, record = %record, "Skipping malformed operation");
                continue;
            };
            if has_empty_segment(operation.key()) {
                warn!(namespace = %namespace, key = %operation.key(), "Skipping operation with an unaddressable key");
                continue;
            }

            let path = format!("data.{namespace}.{}", operation.key());
            match operation {
                Operation::Set { value, .. } => {
                    update.unset.remove(&path);
                    update.set.insert(path, value);
                }
                Operation::Unset { .. } => {
                    update.set.remove(&path);
                    update.unset.insert(path, 1);
                }
            }
        }
    }

    update
}

fn has_empty_segment(path: &str) -> bool {
    path.split('.').any(str::is_empty)
}
