//! The synchronization core.
//!
//! [`SyncClient`] keeps a cache adapter in step with a REST API. Reads are
//! served from the cache when possible and filled from the network
//! otherwise. Writes are optimistic by default: the cache is changed first,
//! the request is sent, and the tentative change is then either confirmed
//! with the server's copy or rolled back.
//!
//! # Failure handling
//!
//! Configuration, precondition and lookup errors are returned before any
//! mutation. A transport failure undoes the tentative change and is then
//! returned to the caller unchanged as [`Error::Transport`]. Nothing is
//! retried.
//!
//! # Concurrency
//!
//! The cache lock is only held for synchronous cache calls, never across a
//! network round-trip. Overlapping writes to the same record are not
//! coordinated: their confirmations and rollbacks land in whatever order the
//! responses arrive, and the last one wins.

use crate::cache::{CacheAdapter, UpdateOptions};
use crate::error::{Error, Result};
use crate::mapping::Mappings;
use crate::pending::Pending;
use crate::query::Query;
use crate::request::{resolve, Action, HttpOptions, RequestDescriptor};
use crate::transport::{Transport, TransportError};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;

/// Options for `create`, `update` and `delete`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    /// Wait for the server before touching the cache
    pub wait: bool,
    /// Per-call HTTP options
    pub http: HttpOptions,
}

impl WriteOptions {
    /// Optimistic write with default HTTP options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pessimistic write: the cache only changes after the server confirms.
    pub fn wait() -> Self {
        Self {
            wait: true,
            ..Self::default()
        }
    }

    /// Use `http` for the request.
    pub fn with_http(mut self, http: HttpOptions) -> Self {
        self.http = http;
        self
    }
}

/// Coordinates a cache adapter with a remote API.
#[derive(Debug)]
pub struct SyncClient<C, T> {
    mappings: Mappings,
    cache: Mutex<C>,
    transport: T,
}

impl<C: CacheAdapter, T: Transport> SyncClient<C, T> {
    /// Create a client serving the paths in `mappings`.
    pub fn new(mappings: Mappings, cache: C, transport: T) -> Result<Self> {
        if mappings.is_empty() {
            return Err(Error::MissingMappings);
        }
        Ok(Self {
            mappings,
            cache: Mutex::new(cache),
            transport,
        })
    }

    /// Lock the cache for direct access.
    ///
    /// Do not hold the guard across an `.await`.
    pub fn cache(&self) -> MutexGuard<'_, C> {
        self.cache.lock()
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The configured mappings.
    pub fn mappings(&self) -> &Mappings {
        &self.mappings
    }

    fn with_cache<R>(&self, f: impl FnOnce(&mut C) -> Result<R>) -> Result<R> {
        let mut cache = self.cache.lock();
        f(&mut cache)
    }

    /// Fetch a single record.
    ///
    /// Served from the cache when `query` matches a cached record, unless
    /// `options.force` is set. A fetched record is merged into the cache, or
    /// replaces the cached copy when forced.
    pub async fn find(&self, path: &str, query: &Query, options: &HttpOptions) -> Result<Value> {
        let request = resolve(&self.mappings, path, Action::Find, query, options)?;

        if !request.force {
            if let Some(record) = self.with_cache(|cache| cache.get(path, query))? {
                tracing::debug!(path = %path, "Cache hit");
                return Ok(record);
            }
            tracing::debug!(path = %path, "Cache miss, fetching");
        }

        let data = self
            .transport
            .find(&request.url(), &request.params, &request.headers)
            .await?;
        let data = request.transform(data);

        if !data.is_null() {
            let options = if request.force {
                UpdateOptions::replace()
            } else {
                UpdateOptions::merge()
            };
            let id = data
                .get(&request.identifier)
                .or_else(|| query.get(&request.identifier))
                .cloned();
            self.with_cache(|cache| match id {
                Some(id) => {
                    cache.update(path, &request.identifier, &id, Some(data.clone()), options)
                }
                // Without an identifier there is no member to replace
                None if cache.read(path)?.is_array() => {
                    tracing::debug!(path = %path, "Response has no identifier, not cached");
                    Ok(Value::Null)
                }
                None => cache.insert(path, data.clone()),
            })?;
        }

        Ok(data)
    }

    /// Fetch the members of a collection matching `query`.
    ///
    /// Served from the cache when at least one cached member matches, unless
    /// `options.force` is set. Fetched members are upserted into the cache;
    /// when forced, the response replaces the cached collection outright.
    pub async fn find_all(
        &self,
        path: &str,
        query: &Query,
        options: &HttpOptions,
    ) -> Result<Vec<Value>> {
        let request = resolve(&self.mappings, path, Action::FindAll, query, options)?;

        if !request.force {
            if let Some(records) = self.with_cache(|cache| cache.get_collection(path, query))? {
                tracing::debug!(path = %path, count = records.len(), "Cache hit");
                return Ok(records);
            }
            tracing::debug!(path = %path, "Cache miss, fetching");
        }

        let data = self
            .transport
            .find(&request.url(), &request.params, &request.headers)
            .await?;
        let records = match request.transform(data) {
            Value::Array(records) => records,
            Value::Null => Vec::new(),
            record => vec![record],
        };

        self.with_cache(|cache| {
            if request.force {
                cache.reset(path, Value::Array(records.clone()))?;
                return Ok(());
            }
            for record in &records {
                match record.get(&request.identifier) {
                    Some(id) => cache.update(
                        path,
                        &request.identifier,
                        id,
                        Some(record.clone()),
                        UpdateOptions::merge(),
                    )?,
                    None => cache.insert(path, record.clone())?,
                };
            }
            Ok(())
        })?;

        Ok(records)
    }

    /// Create a record.
    ///
    /// Optimistically, `attributes` are cached at once under a correlation
    /// tag and swapped for the server's copy on success. With
    /// `options.wait`, only the server's copy is ever cached.
    pub async fn create(
        &self,
        path: &str,
        attributes: Value,
        options: &WriteOptions,
    ) -> Result<Value> {
        let request = resolve(
            &self.mappings,
            path,
            Action::Create,
            &Query::new(),
            &options.http,
        )?;
        let url = request.url();

        if options.wait {
            let data = self
                .transport
                .create(&url, &attributes, &request.params, &request.headers)
                .await?;
            let data = request.transform(data);
            let confirmed = if data.is_null() { attributes } else { data };
            return self.with_cache(|cache| cache.insert(path, confirmed));
        }

        let pending = self.with_cache(|cache| Pending::insert(cache, path, attributes.clone()))?;
        let outcome = self
            .transport
            .create(&url, &attributes, &request.params, &request.headers)
            .await;
        self.settle(pending, &request, outcome)
    }

    /// Update the record selected by `query`.
    ///
    /// The record's identifier comes from `query`, or failing that from
    /// `attributes`. Optimistically, `attributes` replace the cached record
    /// at once and the previous copy is restored if the request fails.
    pub async fn update(
        &self,
        path: &str,
        query: &Query,
        attributes: Value,
        options: &WriteOptions,
    ) -> Result<Value> {
        if attributes.is_array() {
            return Err(Error::ArrayAttributes(path.to_string()));
        }
        let mut request = resolve(&self.mappings, path, Action::Update, query, &options.http)?;
        let identifier = request.identifier.clone();
        let id = query
            .get(&identifier)
            .or_else(|| attributes.get(&identifier))
            .cloned()
            .ok_or_else(|| Error::MissingIdentifier {
                path: path.to_string(),
                identifier: identifier.clone(),
            })?;
        request.bind_identifier(&id);
        let url = request.url();

        // The cached copy always keeps its identifier
        let mut tentative = attributes.clone();
        if let Value::Object(fields) = &mut tentative {
            fields.entry(identifier.clone()).or_insert_with(|| id.clone());
        }

        if options.wait {
            let data = self
                .transport
                .update(&url, &attributes, &request.params, &request.headers)
                .await?;
            let data = request.transform(data);
            let confirmed = if data.is_null() { tentative } else { data };
            return self.with_cache(|cache| {
                cache.update(path, &identifier, &id, Some(confirmed), UpdateOptions::replace())
            });
        }

        let pending =
            self.with_cache(|cache| Pending::update(cache, path, &identifier, id, tentative))?;
        let outcome = self
            .transport
            .update(&url, &attributes, &request.params, &request.headers)
            .await;
        self.settle(pending, &request, outcome)
    }

    /// Delete the record selected by `query`.
    ///
    /// The record must be cached. Optimistically, it is removed at once and
    /// re-inserted if the request fails. Resolves to the transformed
    /// response, or to the removed record when the response is empty.
    pub async fn delete(&self, path: &str, query: &Query, options: &WriteOptions) -> Result<Value> {
        let mut request = resolve(&self.mappings, path, Action::Delete, query, &options.http)?;
        let identifier = request.identifier.clone();

        let data = self
            .with_cache(|cache| cache.get(path, query))?
            .ok_or_else(|| Error::NoDataToDelete {
                path: path.to_string(),
                query: Value::Object(query.clone()).to_string(),
            })?;
        let id = data
            .get(&identifier)
            .cloned()
            .ok_or_else(|| Error::MissingIdentifier {
                path: path.to_string(),
                identifier: identifier.clone(),
            })?;
        request.bind_identifier(&id);
        let url = request.url();

        if options.wait {
            self.transport
                .delete(&url, &data, &request.params, &request.headers)
                .await?;
            return self.with_cache(|cache| {
                cache.update(path, &identifier, &id, None, UpdateOptions::default())
            });
        }

        let pending = self.with_cache(|cache| Pending::remove(cache, path, &identifier, &id))?;
        let outcome = self
            .transport
            .delete(&url, &data, &request.params, &request.headers)
            .await;
        self.settle(pending, &request, outcome)
    }

    /// Confirm or undo `pending` according to the network outcome.
    ///
    /// A transport failure is always returned as-is, even if undoing the
    /// tentative change fails too.
    fn settle(
        &self,
        pending: Pending,
        request: &RequestDescriptor,
        outcome: std::result::Result<Value, TransportError>,
    ) -> Result<Value> {
        match outcome {
            Ok(data) => {
                let data = request.transform(data);
                tracing::debug!(path = %pending.path(), "Committing optimistic change");
                self.with_cache(|cache| pending.commit(cache, data))
            }
            Err(err) => {
                tracing::warn!(
                    path = %pending.path(),
                    status = ?err.status,
                    "Request failed, rolling back optimistic change"
                );
                let path = pending.path().to_string();
                if let Err(rollback) = self.with_cache(|cache| pending.rollback(cache)) {
                    tracing::warn!(path = %path, error = %rollback, "Rollback failed");
                }
                Err(Error::Transport(err))
            }
        }
    }
}
