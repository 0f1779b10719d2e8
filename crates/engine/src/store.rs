//! Shared data store: the keyed exchange every link reads inputs from and
//! publishes outputs to.
//!
//! The store maps string keys to opaque JSON values and performs no
//! validation of its own beyond the JSON kind tag. Insertion order is
//! preserved so links that enumerate all entries see them in a deterministic
//! sequence and snapshots of an unchanged store serialize identically.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error surfaced by store lookups and removals.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Required key is absent.
    #[error("key '{0}' not found in data store")]
    KeyNotFound(String),
    /// Value is present but carries the wrong kind tag.
    #[error("value at key '{key}' is {actual}, expected {expected}")]
    TypeMismatch {
        /// Key whose value was requested.
        key: String,
        /// Kind the caller asked for.
        expected: &'static str,
        /// Kind actually stored.
        actual: &'static str,
    },
}

/// Kind tag of a JSON value, as used in [`StoreError::TypeMismatch`].
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Insertion-ordered mapping from string key to opaque JSON value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DataStore {
    entries: IndexMap<String, Value>,
}

impl DataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value at `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Inserts `value` under `key`, silently overwriting any prior value.
    /// A fresh key is appended at the end of the iteration order; an
    /// overwritten key keeps its original position.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Removes the value at `key`, failing when the key is absent.
    /// The relative order of the remaining entries is preserved.
    pub fn delete(&mut self, key: &str) -> Result<Value, StoreError> {
        self.entries
            .shift_remove(key)
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry; used between independent runs.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn require(&self, key: &str) -> Result<&Value, StoreError> {
        self.entries.get(key).ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    /// Returns the value at `key` as a string slice.
    pub fn get_str(&self, key: &str) -> Result<&str, StoreError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| self.mismatch(key, "string", value))
    }

    /// Returns the value at `key` as a boolean.
    pub fn get_bool(&self, key: &str) -> Result<bool, StoreError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| self.mismatch(key, "boolean", value))
    }

    /// Returns the value at `key` as a signed integer.
    pub fn get_i64(&self, key: &str) -> Result<i64, StoreError> {
        let value = self.require(key)?;
        value.as_i64().ok_or_else(|| self.mismatch(key, "number", value))
    }

    /// Returns the value at `key` as a float.
    pub fn get_f64(&self, key: &str) -> Result<f64, StoreError> {
        let value = self.require(key)?;
        value.as_f64().ok_or_else(|| self.mismatch(key, "number", value))
    }

    /// Returns the value at `key` as an array.
    pub fn get_array(&self, key: &str) -> Result<&Vec<Value>, StoreError> {
        let value = self.require(key)?;
        value.as_array().ok_or_else(|| self.mismatch(key, "array", value))
    }

    /// Returns the value at `key` as an object.
    pub fn get_object(&self, key: &str) -> Result<&serde_json::Map<String, Value>, StoreError> {
        let value = self.require(key)?;
        value.as_object().ok_or_else(|| self.mismatch(key, "object", value))
    }

    fn mismatch(&self, key: &str, expected: &'static str, value: &Value) -> StoreError {
        StoreError::TypeMismatch {
            key: key.to_string(),
            expected,
            actual: value_kind(value),
        }
    }
}
