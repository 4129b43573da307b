//! Tentative cache mutations awaiting network confirmation.
//!
//! An optimistic write is applied to the cache first and recorded as a
//! [`Pending`] value. Once the network call settles, the pending value is
//! consumed by exactly one of [`Pending::commit`] or [`Pending::rollback`].
//!
//! Records inserted optimistically have no server identifier yet. They carry
//! a [`CorrelationId`] under [`CID_FIELD`] until the server's copy replaces
//! them.

use crate::cache::{CacheAdapter, UpdateOptions};
use crate::error::{Error, Result};
use crate::query::{self, Query};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Field carrying the correlation tag of a tentatively inserted record.
pub const CID_FIELD: &str = "_cid";

/// Tag locating a tentative record before it has a server identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh random tag.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Query selecting the record carrying this tag.
    pub fn query(&self) -> Query {
        query::by_field(CID_FIELD, Value::String(self.to_string()))
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// An optimistic mutation already applied to the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending {
    /// A tagged record was inserted.
    Insert { path: String, cid: CorrelationId },
    /// A record was replaced; `original` is its state beforehand, if it was
    /// cached at all.
    Update {
        path: String,
        identifier: String,
        id: Value,
        original: Option<Value>,
    },
    /// A record was removed.
    Remove { path: String, removed: Value },
}

impl Pending {
    /// Insert `attrs` tagged with a new correlation id.
    pub fn insert<C: CacheAdapter + ?Sized>(
        cache: &mut C,
        path: &str,
        attrs: Value,
    ) -> Result<Self> {
        let mut fields = match attrs {
            Value::Object(fields) => fields,
            Value::Array(_) => return Err(Error::ArrayAttributes(path.to_string())),
            _ => return Err(Error::NotARecord(path.to_string())),
        };
        let cid = CorrelationId::new();
        fields.insert(CID_FIELD.to_string(), Value::String(cid.to_string()));
        cache.insert(path, Value::Object(fields))?;

        Ok(Pending::Insert {
            path: path.to_string(),
            cid,
        })
    }

    /// Replace the record identified by `id` with `attrs`.
    ///
    /// The snapshot is read before the write, under the same borrow.
    pub fn update<C: CacheAdapter + ?Sized>(
        cache: &mut C,
        path: &str,
        identifier: &str,
        id: Value,
        attrs: Value,
    ) -> Result<Self> {
        let original = cache.get(path, &query::by_field(identifier, id.clone()))?;
        cache.update(path, identifier, &id, Some(attrs), UpdateOptions::replace())?;

        Ok(Pending::Update {
            path: path.to_string(),
            identifier: identifier.to_string(),
            id,
            original,
        })
    }

    /// Remove the record identified by `id`.
    pub fn remove<C: CacheAdapter + ?Sized>(
        cache: &mut C,
        path: &str,
        identifier: &str,
        id: &Value,
    ) -> Result<Self> {
        let removed = cache.update(path, identifier, id, None, UpdateOptions::default())?;

        Ok(Pending::Remove {
            path: path.to_string(),
            removed,
        })
    }

    /// The cache path the mutation touched.
    pub fn path(&self) -> &str {
        match self {
            Pending::Insert { path, .. } => path,
            Pending::Update { path, .. } => path,
            Pending::Remove { path, .. } => path,
        }
    }

    /// Confirm the mutation with the server's canonical `data`.
    ///
    /// Returns the confirmed value. An empty response confirms the tentative
    /// state as it stands (minus the correlation tag).
    pub fn commit<C: CacheAdapter + ?Sized>(self, cache: &mut C, data: Value) -> Result<Value> {
        match self {
            Pending::Insert { path, cid } => {
                let confirmed = if data.is_null() {
                    let mut tentative = cache.get(&path, &cid.query())?.ok_or_else(|| {
                        Error::RecordNotFound {
                            path: path.clone(),
                            query: Value::Object(cid.query()).to_string(),
                        }
                    })?;
                    if let Value::Object(fields) = &mut tentative {
                        fields.remove(CID_FIELD);
                    }
                    tentative
                } else {
                    data
                };
                cache.update_where(&path, &cid.query(), Some(confirmed), UpdateOptions::replace())
            }
            Pending::Update {
                path,
                identifier,
                id,
                ..
            } => {
                let query = query::by_field(&identifier, id);
                if data.is_null() {
                    return cache.get(&path, &query)?.ok_or_else(|| Error::RecordNotFound {
                        path,
                        query: Value::Object(query).to_string(),
                    });
                }
                cache.update_where(&path, &query, Some(data), UpdateOptions::replace())
            }
            Pending::Remove { removed, .. } => {
                Ok(if query::is_blank(&data) { removed } else { data })
            }
        }
    }

    /// Undo the mutation.
    pub fn rollback<C: CacheAdapter + ?Sized>(self, cache: &mut C) -> Result<()> {
        match self {
            Pending::Insert { path, cid } => {
                cache.update_where(&path, &cid.query(), None, UpdateOptions::default())?;
            }
            Pending::Update {
                path,
                identifier,
                id,
                original: Some(original),
            } => {
                let query = query::by_field(&identifier, id);
                cache.update_where(&path, &query, Some(original), UpdateOptions::replace())?;
            }
            Pending::Update {
                path,
                identifier,
                id,
                original: None,
            } => {
                cache.update(&path, &identifier, &id, None, UpdateOptions::default())?;
            }
            Pending::Remove { path, removed } => {
                cache.insert(&path, removed)?;
            }
        }
        Ok(())
    }
}
