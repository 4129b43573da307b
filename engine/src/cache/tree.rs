//! Reactive tree cache.
//!
//! Every mutation goes through one of the tree primitives (`set`, `merge`,
//! `push`, `splice`). The changes made by a single contract call are
//! buffered and published together once the call completes, so a subscriber
//! never observes a half-applied update.

use super::{merge_at, push_at, set_at, splice_at, CacheAdapter};
use crate::error::Result;
use crate::path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

/// Number of updates a lagging subscriber may fall behind by.
const CHANNEL_CAPACITY: usize = 256;

/// The primitive that produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Set,
    Merge,
    Push,
    Splice,
}

/// A single primitive mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Which primitive ran
    pub kind: ChangeKind,
    /// Path it ran against
    pub path: String,
    /// Collection member affected, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// All changes made by one cache call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeUpdate {
    /// Monotonic revision of the tree after this update
    pub revision: u64,
    /// Changes in the order they were applied
    pub changes: Vec<Change>,
}

/// A cache that notifies subscribers of every update.
#[derive(Debug)]
pub struct TreeCache {
    root: Value,
    revision: u64,
    pending: Vec<Change>,
    sender: broadcast::Sender<TreeUpdate>,
}

impl TreeCache {
    /// Create a reactive cache over an existing tree.
    pub fn new(root: Value) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            root,
            revision: 0,
            pending: Vec::new(),
            sender,
        }
    }

    /// Receive an update for every cache call that changed the tree.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeUpdate> {
        self.sender.subscribe()
    }

    /// The whole tree.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Number of updates published so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn record(&mut self, kind: ChangeKind, path: &str, index: Option<usize>) {
        self.pending.push(Change {
            kind,
            path: path.to_string(),
            index,
        });
    }
}

impl CacheAdapter for TreeCache {
    fn read(&self, path: &str) -> Result<Value> {
        path::read(&self.root, path).cloned()
    }

    fn set(&mut self, path: &str, value: Value) -> Result<Value> {
        let previous = set_at(&mut self.root, path, value)?;
        self.record(ChangeKind::Set, path, None);
        Ok(previous)
    }

    fn merge(
        &mut self,
        path: &str,
        index: Option<usize>,
        attrs: &Map<String, Value>,
    ) -> Result<Value> {
        let merged = merge_at(&mut self.root, path, index, attrs)?;
        self.record(ChangeKind::Merge, path, index);
        Ok(merged)
    }

    fn push(&mut self, path: &str, items: Vec<Value>) -> Result<()> {
        push_at(&mut self.root, path, items)?;
        self.record(ChangeKind::Push, path, None);
        Ok(())
    }

    fn splice(&mut self, path: &str, index: usize, replacement: Option<Value>) -> Result<Value> {
        let previous = splice_at(&mut self.root, path, index, replacement)?;
        self.record(ChangeKind::Splice, path, Some(index));
        Ok(previous)
    }

    fn commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.revision += 1;
        let update = TreeUpdate {
            revision: self.revision,
            changes: std::mem::take(&mut self.pending),
        };
        tracing::trace!(revision = update.revision, changes = update.changes.len(), "Tree updated");
        // No subscribers is fine
        let _ = self.sender.send(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::UpdateOptions;
    use serde_json::json;

    #[test]
    fn one_update_per_call() {
        let mut cache = TreeCache::new(json!({"todos": [{"id": 1}, {"id": 2}, {"id": 3}]}));
        let mut updates = cache.subscribe();

        cache
            .update_all(
                "todos",
                "id",
                vec![json!({"id": 1, "a": "a"}), json!({"id": 4})],
                UpdateOptions::merge(),
            )
            .unwrap();

        let update = updates.try_recv().unwrap();
        assert_eq!(update.revision, 1);
        assert_eq!(
            update
                .changes
                .iter()
                .map(|c| c.kind)
                .collect::<Vec<_>>(),
            vec![
                ChangeKind::Splice,
                ChangeKind::Splice,
                ChangeKind::Merge,
                ChangeKind::Push,
            ]
        );
        assert!(updates.try_recv().is_err());
        assert_eq!(cache.root(), &json!({"todos": [{"id": 1, "a": "a"}, {"id": 4}]}));
    }

    #[test]
    fn reads_publish_nothing() {
        let mut cache = TreeCache::new(json!({"todos": [{"id": 1}]}));
        let mut updates = cache.subscribe();

        let mut query = Map::new();
        query.insert("id".into(), json!(1));
        cache.get("todos", &query).unwrap();
        assert!(updates.try_recv().is_err());

        cache.insert("todos", json!({"id": 2})).unwrap();
        let update = updates.try_recv().unwrap();
        assert_eq!(
            update.changes,
            vec![Change {
                kind: ChangeKind::Push,
                path: "todos".into(),
                index: None,
            }]
        );
        assert_eq!(cache.revision(), 1);
    }

    #[test]
    fn failed_calls_publish_completed_changes_only() {
        let mut cache = TreeCache::new(json!({"todos": [{"id": 1}]}));
        let mut updates = cache.subscribe();

        assert!(cache
            .update("todos", "id", &json!(5), None, UpdateOptions::default())
            .is_err());
        assert!(updates.try_recv().is_err());
        assert_eq!(cache.revision(), 0);
    }
}
