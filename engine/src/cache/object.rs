//! Plain nested-object cache.

use super::{merge_at, push_at, set_at, splice_at, CacheAdapter};
use crate::error::Result;
use crate::path;
use serde_json::{Map, Value};

/// A cache held in a single owned JSON tree.
///
/// The tree is expected to be pre-shaped: every path the cache is asked
/// about must already exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectCache {
    store: Value,
}

impl ObjectCache {
    /// Create a cache over an existing tree.
    pub fn new(store: Value) -> Self {
        Self { store }
    }

    /// The whole tree.
    pub fn store(&self) -> &Value {
        &self.store
    }

    /// Consume the cache, returning its tree.
    pub fn into_inner(self) -> Value {
        self.store
    }
}

impl CacheAdapter for ObjectCache {
    fn read(&self, path: &str) -> Result<Value> {
        path::read(&self.store, path).cloned()
    }

    fn set(&mut self, path: &str, value: Value) -> Result<Value> {
        set_at(&mut self.store, path, value)
    }

    fn merge(
        &mut self,
        path: &str,
        index: Option<usize>,
        attrs: &Map<String, Value>,
    ) -> Result<Value> {
        merge_at(&mut self.store, path, index, attrs)
    }

    fn push(&mut self, path: &str, items: Vec<Value>) -> Result<()> {
        push_at(&mut self.store, path, items)
    }

    fn splice(&mut self, path: &str, index: usize, replacement: Option<Value>) -> Result<Value> {
        splice_at(&mut self.store, path, index, replacement)
    }
}
