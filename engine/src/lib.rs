//! # Ripple Engine
//!
//! Optimistic synchronization between an in-memory cache and a REST API.
//!
//! The engine keeps a nested JSON cache in step with remote resources. Reads
//! are answered from the cache when it already holds matching data; writes
//! are applied to the cache immediately and reconciled once the server
//! answers.
//!
//! ## Design Principles
//!
//! - **No IO**: network access goes through the [`Transport`] trait
//! - **One cache contract**: every [`CacheAdapter`] builds the same record
//!   operations on a few storage primitives
//! - **Failures are never swallowed**: a failed request rolls back its
//!   tentative change and surfaces the original [`TransportError`]
//!
//! ## Core Concepts
//!
//! ### Paths and Queries
//!
//! Cache locations are dotted paths (`"todos"`, `"lists.inbox"`). The first
//! segment selects a [`Mapping`] describing the remote endpoint. Records in a
//! collection are selected with a [`Query`]: a partial record whose fields
//! must all match.
//!
//! ### Cache Adapters
//!
//! - [`ObjectCache`] - a plain owned tree
//! - [`TreeCache`] - a reactive tree with change subscriptions
//! - [`KeyValueCache`] - top-level entries kept in an external store
//!
//! ### Optimistic Writes
//!
//! A write produces a [`Pending`] mutation that is later committed with the
//! server's copy or rolled back. Records created before the server assigns an
//! identifier carry a [`CorrelationId`] in their `_cid` field.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ripple_engine::{
//!     HttpOptions, Mapping, Mappings, ObjectCache, Query, SyncClient, Transport, WriteOptions,
//! };
//! use serde_json::json;
//!
//! async fn run<T: Transport>(transport: T) -> ripple_engine::Result<()> {
//!     let mappings = Mappings::new().with("todos", Mapping::new("/api/todos"));
//!     let cache = ObjectCache::new(json!({"todos": []}));
//!     let client = SyncClient::new(mappings, cache, transport)?;
//!
//!     // Shows up in the cache before the server answers
//!     let todo = client
//!         .create("todos", json!({"title": "Buy milk"}), &WriteOptions::new())
//!         .await?;
//!
//!     let all = client.find_all("todos", &Query::new(), &HttpOptions::new()).await?;
//!     assert!(all.contains(&todo));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod mapping;
pub mod path;
pub mod pending;
pub mod query;
pub mod request;
pub mod sync;
pub mod transport;

// Re-export main types at crate root
pub use cache::{
    CacheAdapter, Change, ChangeKind, KeyValueCache, KeyValueStore, MemoryStore, ObjectCache,
    TreeCache, TreeUpdate, UpdateOptions,
};
pub use error::{Error, Result};
pub use mapping::{Mapping, Mappings, ResponseTransform, Transform, DEFAULT_IDENTIFIER};
pub use pending::{CorrelationId, Pending, CID_FIELD};
pub use query::Query;
pub use request::{resolve, Action, HttpOptions, RequestDescriptor};
pub use sync::{SyncClient, WriteOptions};
pub use transport::{Headers, Params, Transport, TransportError};
