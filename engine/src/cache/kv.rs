//! Cache spread over an external key/value store.
//!
//! The leading path segment names a store entry; the rest of the path is
//! resolved inside that entry's value. Each primitive loads the entry,
//! applies the change and writes it back.

use super::{merge_at, push_at, set_at, splice_at, CacheAdapter};
use crate::error::{Error, Result};
use crate::path;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Storage backing a [`KeyValueCache`].
pub trait KeyValueStore: Send {
    /// Load the entry stored under `key`.
    fn load(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`.
    fn store(&self, key: &str, value: Value);
}

/// In-memory store shareable between handles.
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite an entry.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Copy of an entry.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Option<Value> {
        self.get(key)
    }

    fn store(&self, key: &str, value: Value) {
        self.insert(key, value);
    }
}

/// A cache whose top-level entries live in a [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct KeyValueCache<S> {
    store: S,
}

impl<S: KeyValueStore> KeyValueCache<S> {
    /// Create a cache over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the entry for `path` wrapped as `{key: entry}`, so the full
    /// path resolves against it.
    fn load_entry(&self, path: &str) -> Result<(String, Value)> {
        let key = path::root(path);
        let entry = self.store.load(key).ok_or_else(|| Error::PathNotFound {
            segment: key.to_string(),
            path: path.to_string(),
        })?;
        let mut root = Map::new();
        root.insert(key.to_string(), entry);
        Ok((key.to_string(), Value::Object(root)))
    }

    fn modify<R>(&mut self, path: &str, f: impl FnOnce(&mut Value) -> Result<R>) -> Result<R> {
        let (key, mut root) = self.load_entry(path)?;
        let result = f(&mut root)?;
        if let Value::Object(mut fields) = root {
            if let Some(entry) = fields.remove(&key) {
                self.store.store(&key, entry);
            }
        }
        Ok(result)
    }
}

impl<S: KeyValueStore> CacheAdapter for KeyValueCache<S> {
    fn read(&self, path: &str) -> Result<Value> {
        let (_, root) = self.load_entry(path)?;
        path::read(&root, path).cloned()
    }

    fn set(&mut self, path: &str, value: Value) -> Result<Value> {
        self.modify(path, |root| set_at(root, path, value))
    }

    fn merge(
        &mut self,
        path: &str,
        index: Option<usize>,
        attrs: &Map<String, Value>,
    ) -> Result<Value> {
        self.modify(path, |root| merge_at(root, path, index, attrs))
    }

    fn push(&mut self, path: &str, items: Vec<Value>) -> Result<()> {
        self.modify(path, |root| push_at(root, path, items))
    }

    fn splice(&mut self, path: &str, index: usize, replacement: Option<Value>) -> Result<Value> {
        self.modify(path, |root| splice_at(root, path, index, replacement))
    }
}
