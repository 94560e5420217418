//! Update instructions addressed by dotted paths.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::SessionDocument;
use crate::error::{Result, StoreError};

/// A partial update against one document.
///
/// Paths are dotted (`data.cart.items`). Empty sections are left out of the
/// serialized form, so an update that only sets fields carries no `$unset`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Path to new value.
    #[serde(rename = "$set", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<String, Value>,

    /// Path to `1`; the leaf is removed.
    #[serde(rename = "$unset", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unset: BTreeMap<String, i32>,

    /// Path to integer delta.
    #[serde(rename = "$inc", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inc: BTreeMap<String, i64>,
}

impl Update {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a path to a value.
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(path.into(), value.into());
        self
    }

    /// Remove a path.
    pub fn unset(mut self, path: impl Into<String>) -> Self {
        self.unset.insert(path.into(), 1);
        self
    }

    /// Increment an integer path.
    pub fn inc(mut self, path: impl Into<String>, delta: i64) -> Self {
        self.inc.insert(path.into(), delta);
        self
    }

    /// Whether the update carries no instructions at all.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.inc.is_empty()
    }

    /// Apply the update to a document's JSON object form.
    ///
    /// Sets are applied first, then unsets, then increments. Returns whether
    /// anything changed.
    pub fn apply(&self, doc: &mut Map<String, Value>) -> Result<bool> {
        let mut modified = false;

        for (path, value) in &self.set {
            modified |= set_path(doc, path, value.clone())?;
        }
        for path in self.unset.keys() {
            modified |= unset_path(doc, path)?;
        }
        for (path, delta) in &self.inc {
            modified |= inc_path(doc, path, *delta)?;
        }

        Ok(modified)
    }
}

/// Outcome of applying an update to a possibly missing document.
pub(crate) struct Applied {
    pub before: Option<SessionDocument>,
    pub after: SessionDocument,
    pub modified: bool,
}

/// Apply `update` to `existing`, creating `{ "_id": id }` first when upserting.
///
/// Returns `None` when there is no document and upsert is off.
pub(crate) fn apply_to_document(
    id: &str,
    existing: Option<SessionDocument>,
    update: &Update,
    upsert: bool,
) -> Result<Option<Applied>> {
    let (before, mut target) = match existing {
        Some(doc) => (Some(doc.clone()), doc.into_map()?),
        None if upsert => {
            let mut map = Map::new();
            map.insert("_id".to_string(), Value::String(id.to_string()));
            (None, map)
        }
        None => return Ok(None),
    };

    let modified = update.apply(&mut target)? || before.is_none();
    let after = SessionDocument::from_map(target)?;

    Ok(Some(Applied {
        before,
        after,
        modified,
    }))
}

fn split_path(path: &str) -> Result<(Vec<&str>, &str)> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid(path, "empty path segment"));
    }
    if segments[0] == "_id" {
        return Err(invalid(path, "the identifier is immutable"));
    }
    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| invalid(path, "empty path"))?;
    Ok((parents.to_vec(), *leaf))
}

fn invalid(path: &str, reason: impl Into<String>) -> StoreError {
    StoreError::InvalidUpdate {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Walk to the parent object of a path, creating missing objects.
fn parent_mut<'a>(
    root: &'a mut Map<String, Value>,
    path: &str,
    parents: &[&str],
) -> Result<&'a mut Map<String, Value>> {
    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => return Err(invalid(path, format!("'{segment}' is not an object"))),
        };
    }
    Ok(current)
}

fn set_path(root: &mut Map<String, Value>, path: &str, value: Value) -> Result<bool> {
    let (parents, leaf) = split_path(path)?;
    let parent = parent_mut(root, path, &parents)?;
    if parent.get(leaf) == Some(&value) {
        return Ok(false);
    }
    parent.insert(leaf.to_string(), value);
    Ok(true)
}

fn unset_path(root: &mut Map<String, Value>, path: &str) -> Result<bool> {
    let (parents, leaf) = split_path(path)?;
    let mut current = root;
    for segment in parents {
        match current.get_mut(segment).and_then(Value::as_object_mut) {
            Some(map) => current = map,
            None => return Ok(false),
        }
    }
    Ok(current.remove(leaf).is_some())
}

fn inc_path(root: &mut Map<String, Value>, path: &str, delta: i64) -> Result<bool> {
    let (parents, leaf) = split_path(path)?;
    let parent = parent_mut(root, path, &parents)?;
    let current = match parent.get(leaf) {
        None | Some(Value::Null) => 0,
        Some(value) => value
            .as_i64()
            .ok_or_else(|| invalid(path, "cannot increment a non-integer"))?,
    };
    parent.insert(leaf.to_string(), Value::from(current.saturating_add(delta)));
    Ok(delta != 0)
}
