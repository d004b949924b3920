//! Flat form submissions and dotted-path property access.
//!
//! The host serializes a sheet form into a flat mapping of dotted field
//! paths (`system.attributes.attr3.value`) to primitive values. [`FormData`]
//! holds that mapping and converts between it and the nested object shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// A flat form submission keyed by dotted field path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, Value>);

impl FormData {
    /// Create an empty submission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(path.into(), value.into())
    }

    /// Builder form of [`FormData::insert`].
    pub fn with(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(path, value);
        self
    }

    /// Read a field.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.get(path)
    }

    /// Remove a field.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        self.0.remove(path)
    }

    /// Returns true if the field is present.
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over fields in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merge another submission into this one; its fields win.
    pub fn extend(&mut self, other: FormData) {
        self.0.extend(other.0);
    }

    /// Remove `prefix` itself and every field below it. Returns how many were removed.
    pub fn remove_subtree(&mut self, prefix: &str) -> usize {
        let nested = format!("{prefix}.");
        let before = self.0.len();
        self.0.retain(|k, _| k != prefix && !k.starts_with(&nested));
        before - self.0.len()
    }

    /// Expand the dotted paths into a nested object.
    pub fn expand(&self) -> CoreResult<Value> {
        let mut root = Value::Object(Map::new());
        for (path, value) in &self.0 {
            if !set_property(&mut root, path, value.clone()) {
                return Err(CoreError::FormConflict(path.clone()));
            }
        }
        Ok(root)
    }

    /// Flatten a nested object into dotted paths.
    ///
    /// Empty objects and non-object values become fields of their own.
    pub fn flatten(value: &Value) -> Self {
        let mut form = Self::new();
        if let Value::Object(map) = value {
            flatten_into(&mut form.0, None, map);
        }
        form
    }
}

fn flatten_into(out: &mut BTreeMap<String, Value>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let path = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(out, Some(&path), inner),
            _ => {
                out.insert(path, value.clone());
            }
        }
    }
}

impl FromIterator<(String, Value)> for FormData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FormData {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Read the value at a dotted path inside nested objects.
pub fn get_property<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(data, |current, part| current.as_object()?.get(part))
}

/// Write a value at a dotted path, creating intermediate objects.
///
/// Returns false, leaving `data` untouched at the conflict, if the path runs
/// through a non-object value.
pub fn set_property(data: &mut Value, path: &str, value: Value) -> bool {
    let mut current = data;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        let Some(map) = current.as_object_mut() else {
            return false;
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), value);
            return true;
        }
        current = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    false
}
