//! Cache adapters.
//!
//! A cache adapter stores records and collections in a nested JSON tree
//! addressed by dotted paths. Implementations only supply a handful of
//! primitives (`read`, `set`, `merge`, `push`, `splice`); the record-level
//! contract used by the synchronization core is built on top of them as
//! provided methods, so every adapter behaves identically.
//!
//! Three adapters ship with the engine:
//! - [`ObjectCache`] - a plain owned tree
//! - [`TreeCache`] - a reactive tree publishing one update per call
//! - [`KeyValueCache`] - a tree spread over an external key/value store

mod kv;
mod object;
mod tree;

pub use kv::{KeyValueCache, KeyValueStore, MemoryStore};
pub use object::ObjectCache;
pub use tree::{Change, ChangeKind, TreeCache, TreeUpdate};

use crate::error::{Error, Result};
use crate::path;
use crate::query::{self, Query};
use serde_json::{Map, Value};

/// How a found record is combined with new attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOptions {
    /// Replace the record wholesale instead of shallow-merging into it
    pub replace: bool,
}

impl UpdateOptions {
    /// Shallow-merge attributes into the existing record.
    pub fn merge() -> Self {
        Self { replace: false }
    }

    /// Replace the existing record.
    pub fn replace() -> Self {
        Self { replace: true }
    }
}

/// Storage contract shared by every cache flavour.
pub trait CacheAdapter: Send {
    /// Copy of the value stored at `path`.
    fn read(&self, path: &str) -> Result<Value>;

    /// Store `value` at `path`, returning what was there before.
    fn set(&mut self, path: &str, value: Value) -> Result<Value>;

    /// Shallow-merge `attrs` into the record at `path` (or at `index` within
    /// the collection at `path`), returning the merged record.
    fn merge(&mut self, path: &str, index: Option<usize>, attrs: &Map<String, Value>)
        -> Result<Value>;

    /// Append `items` to the collection at `path`.
    fn push(&mut self, path: &str, items: Vec<Value>) -> Result<()>;

    /// Remove (or replace, when `replacement` is given) the member at
    /// `index`, returning the previous member.
    fn splice(&mut self, path: &str, index: usize, replacement: Option<Value>) -> Result<Value>;

    /// Called once at the end of every contract operation.
    fn commit(&mut self) {}

    /// The record at `path` selected by `query`.
    fn get(&self, path: &str, query: &Query) -> Result<Option<Value>> {
        if query.is_empty() {
            return Err(Error::EmptyQuery(path.to_string()));
        }
        let data = self.read(path)?;
        Ok(query::find(&data, query).cloned())
    }

    /// Members of the collection at `path` selected by `query`.
    ///
    /// `None` when nothing matched, including when the collection is empty.
    fn get_collection(&self, path: &str, query: &Query) -> Result<Option<Vec<Value>>> {
        let data = self.read(path)?;
        let Value::Array(records) = &data else {
            return Err(Error::NotACollection(path.to_string()));
        };
        Ok(query::filter(records, query).map(|matched| matched.into_iter().cloned().collect()))
    }

    /// Append to a collection, or fill a single-record slot.
    fn insert(&mut self, path: &str, data: Value) -> Result<Value> {
        let result = insert_data(self, path, data);
        self.commit();
        result
    }

    /// Replace whatever is stored at `path` with `data`, returning the
    /// previous value.
    fn reset(&mut self, path: &str, data: Value) -> Result<Value> {
        let result = self.set(path, data);
        self.commit();
        result
    }

    /// Mutate the record whose `identifier` field equals `id`.
    ///
    /// `attrs == None` removes the record and returns it. A miss with
    /// attributes inserts them.
    fn update(
        &mut self,
        path: &str,
        identifier: &str,
        id: &Value,
        attrs: Option<Value>,
        options: UpdateOptions,
    ) -> Result<Value> {
        let query = query::by_field(identifier, id.clone());
        let result = mutate(self, path, &query, attrs, options);
        self.commit();
        result
    }

    /// Like [`update`](CacheAdapter::update), locating the record by an
    /// arbitrary query.
    fn update_where(
        &mut self,
        path: &str,
        query: &Query,
        attrs: Option<Value>,
        options: UpdateOptions,
    ) -> Result<Value> {
        let result = mutate(self, path, query, attrs, options);
        self.commit();
        result
    }

    /// Reconcile the collection at `path` with `items`.
    ///
    /// Records whose identifier is absent from `items` are removed; every
    /// item is then upserted. Returns the resulting collection.
    fn update_all(
        &mut self,
        path: &str,
        identifier: &str,
        items: Vec<Value>,
        options: UpdateOptions,
    ) -> Result<Vec<Value>> {
        let result = reconcile(self, path, identifier, items, options);
        self.commit();
        result
    }
}

fn insert_data<C: CacheAdapter + ?Sized>(cache: &mut C, path: &str, data: Value) -> Result<Value> {
    let target = cache.read(path)?;
    match (&target, data) {
        (Value::Array(_) | Value::Null, Value::Array(items)) => {
            cache.push(path, items.clone())?;
            Ok(Value::Array(items))
        }
        (_, Value::Array(_)) => Err(Error::ArrayIntoRecord(path.to_string())),
        (Value::Array(_), record) => {
            cache.push(path, vec![record.clone()])?;
            Ok(record)
        }
        (_, record) => {
            cache.set(path, record.clone())?;
            Ok(record)
        }
    }
}

fn mutate<C: CacheAdapter + ?Sized>(
    cache: &mut C,
    path: &str,
    query: &Query,
    attrs: Option<Value>,
    options: UpdateOptions,
) -> Result<Value> {
    if matches!(attrs, Some(Value::Array(_))) {
        return Err(Error::ArrayAttributes(path.to_string()));
    }

    let target = cache.read(path)?;
    let index = match &target {
        Value::Array(records) => query::position(records, query),
        record => query::find(record, query).map(|_| 0),
    };
    let collection = target.is_array();
    let slot = |i: usize| collection.then_some(i);

    match (index, attrs) {
        (None, None) => Err(Error::RecordNotFound {
            path: path.to_string(),
            query: Value::Object(query.clone()).to_string(),
        }),
        (None, Some(attrs)) if collection => {
            cache.push(path, vec![attrs.clone()])?;
            Ok(attrs)
        }
        (None, Some(attrs)) => {
            cache.set(path, attrs.clone())?;
            Ok(attrs)
        }
        (Some(i), None) if collection => cache.splice(path, i, None),
        (Some(_), None) => cache.set(path, Value::Null),
        (Some(i), Some(Value::Object(fields))) if !options.replace => {
            cache.merge(path, slot(i), &fields)
        }
        (Some(i), Some(attrs)) if collection => {
            cache.splice(path, i, Some(attrs.clone()))?;
            Ok(attrs)
        }
        (Some(_), Some(attrs)) => {
            cache.set(path, attrs.clone())?;
            Ok(attrs)
        }
    }
}

fn reconcile<C: CacheAdapter + ?Sized>(
    cache: &mut C,
    path: &str,
    identifier: &str,
    items: Vec<Value>,
    options: UpdateOptions,
) -> Result<Vec<Value>> {
    let Value::Array(current) = cache.read(path)? else {
        return Err(Error::NotACollection(path.to_string()));
    };
    if items.is_empty() {
        return Err(Error::EmptyCollection(path.to_string()));
    }
    if !items.iter().any(|item| item.get(identifier).is_some()) {
        return Err(Error::MissingIdentifier {
            path: path.to_string(),
            identifier: identifier.to_string(),
        });
    }

    let incoming: Vec<&Value> = items.iter().filter_map(|i| i.get(identifier)).collect();
    for stale in current
        .iter()
        .filter_map(|record| record.get(identifier))
        .filter(|id| !incoming.contains(id))
    {
        mutate(
            cache,
            path,
            &query::by_field(identifier, stale.clone()),
            None,
            options,
        )?;
    }

    for item in items {
        let Some(id) = item.get(identifier).cloned() else {
            tracing::warn!(path = %path, identifier = %identifier, "Skipping item without identifier");
            continue;
        };
        mutate(cache, path, &query::by_field(identifier, id), Some(item), options)?;
    }

    match cache.read(path)? {
        Value::Array(records) => Ok(records),
        _ => Err(Error::NotACollection(path.to_string())),
    }
}

// Primitive implementations over an in-memory tree, shared by the adapters.

pub(crate) fn set_at(root: &mut Value, path: &str, value: Value) -> Result<Value> {
    path::write(root, path, value)
}

pub(crate) fn push_at(root: &mut Value, path: &str, items: Vec<Value>) -> Result<()> {
    let slot = path::read_mut(root, path)?;
    match slot {
        Value::Array(records) => records.extend(items),
        Value::Null => *slot = Value::Array(items),
        _ => return Err(Error::NotACollection(path.to_string())),
    }
    Ok(())
}

pub(crate) fn splice_at(
    root: &mut Value,
    path: &str,
    index: usize,
    replacement: Option<Value>,
) -> Result<Value> {
    let Value::Array(records) = path::read_mut(root, path)? else {
        return Err(Error::NotACollection(path.to_string()));
    };
    if index >= records.len() {
        return Err(Error::RecordNotFound {
            path: path.to_string(),
            query: format!("index {index}"),
        });
    }
    Ok(match replacement {
        Some(value) => std::mem::replace(&mut records[index], value),
        None => records.remove(index),
    })
}

pub(crate) fn merge_at(
    root: &mut Value,
    path: &str,
    index: Option<usize>,
    attrs: &Map<String, Value>,
) -> Result<Value> {
    let slot = path::read_mut(root, path)?;
    let record = match index {
        Some(i) => match slot {
            Value::Array(records) => records.get_mut(i).ok_or_else(|| Error::RecordNotFound {
                path: path.to_string(),
                query: format!("index {i}"),
            })?,
            _ => return Err(Error::NotACollection(path.to_string())),
        },
        None => slot,
    };

    match &mut *record {
        Value::Object(fields) => {
            fields.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        other => *other = Value::Object(attrs.clone()),
    }
    Ok(record.clone())
}
