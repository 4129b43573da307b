//! Edge case tests for ripple-engine
//!
//! These tests cover boundary conditions and unusual inputs.

mod common;

use common::{q, MockTransport};
use proptest::prelude::*;
use ripple_engine::{
    path, query, request, Action, CacheAdapter, Error, HttpOptions, Mapping, Mappings,
    ObjectCache, Pending, Query, SyncClient, TransportError, UpdateOptions, WriteOptions,
    CID_FIELD,
};
use serde_json::{json, Value};

fn client(store: Value, transport: MockTransport) -> SyncClient<ObjectCache, MockTransport> {
    let mappings = Mappings::new().with("todos", Mapping::new("/todos"));
    SyncClient::new(mappings, ObjectCache::new(store), transport).unwrap()
}

// ============================================================================
// Identifier Edge Cases
// ============================================================================

#[test]
fn identifiers_are_percent_encoded() {
    let mappings = Mappings::new().with("todos", Mapping::new("/todos"));
    let mut request = request::resolve(
        &mappings,
        "todos",
        Action::Delete,
        &Query::new(),
        &HttpOptions::new(),
    )
    .unwrap();

    request.bind_identifier(&json!("a/b c?"));
    assert_eq!(request.url(), "/todos/a%2Fb%20c%3F");
}

#[test]
fn unicode_identifiers() {
    let mappings = Mappings::new().with("todos", Mapping::new("/todos"));
    let request = request::resolve(
        &mappings,
        "todos",
        Action::Find,
        &q(json!({"id": "日本"})),
        &HttpOptions::new(),
    )
    .unwrap();

    assert_eq!(request.url(), "/todos/%E6%97%A5%E6%9C%AC");
    assert!(request.params.is_empty());
}

#[test]
fn numeric_identifiers_compare_exactly() {
    let cache = ObjectCache::new(json!({"todos": [{"id": 1}, {"id": "1"}]}));

    assert_eq!(
        cache.get("todos", &q(json!({"id": "1"}))).unwrap(),
        Some(json!({"id": "1"}))
    );
    assert_eq!(cache.get("todos", &q(json!({"id": 1.0}))).unwrap(), None);
}

#[tokio::test]
async fn missing_identifier_on_cached_record() {
    let client = client(json!({"todos": [{"title": "untracked"}]}), MockTransport::new());

    let err = client
        .delete("todos", &q(json!({"title": "untracked"})), &WriteOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingIdentifier { .. }));
    assert_eq!(client.cache().read("todos").unwrap().as_array().unwrap().len(), 1);
}

// ============================================================================
// Query Edge Cases
// ============================================================================

#[test]
fn query_values_must_match_structurally() {
    let record = json!({"id": 1, "tags": ["a", "b"], "meta": {"x": 1}});

    assert!(query::matches(&record, &q(json!({"tags": ["a", "b"]}))));
    assert!(!query::matches(&record, &q(json!({"tags": ["b", "a"]}))));
    assert!(query::matches(&record, &q(json!({"meta": {"x": 1}}))));
    assert!(!query::matches(&record, &q(json!({"missing": null}))));
}

#[test]
fn empty_and_unmatched_collections_look_alike() {
    let cache = ObjectCache::new(json!({"empty": [], "todos": [{"id": 1}]}));

    assert_eq!(cache.get_collection("empty", &Query::new()).unwrap(), None);
    assert_eq!(
        cache.get_collection("todos", &q(json!({"id": 2}))).unwrap(),
        None
    );
}

#[tokio::test]
async fn find_with_empty_query_is_rejected() {
    let client = client(json!({"todos": [{"id": 1}]}), MockTransport::new());

    let err = client
        .find("todos", &Query::new(), &HttpOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err, Error::EmptyQuery("todos".into()));
}

// ============================================================================
// Path Edge Cases
// ============================================================================

#[test]
fn deeply_nested_paths() {
    let mut store = json!({});
    let deep = (0..32).map(|i| format!("level{i}")).collect::<Vec<_>>().join(".");

    path::write(&mut store, &deep, json!([])).unwrap();
    assert_eq!(path::read(&store, &deep).unwrap(), &json!([]));
}

#[test]
fn paths_do_not_walk_through_records() {
    let mut store = json!({"todos": [{"id": 1}]});

    assert!(matches!(
        path::write(&mut store, "todos.0", json!({})),
        Err(Error::NotAContainer { .. })
    ));
    assert!(matches!(
        path::read(&store, "todos.0"),
        Err(Error::NotAContainer { .. })
    ));
}

#[tokio::test]
async fn empty_path_is_rejected() {
    let client = client(json!({}), MockTransport::new());

    let err = client
        .create("", json!({"a": 1}), &WriteOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err, Error::MissingPath);
}

// ============================================================================
// Response Edge Cases
// ============================================================================

#[tokio::test]
async fn scalar_envelopes_are_kept() {
    let transport = MockTransport::new().ok(json!({"count": 3}));
    let client = client(json!({"todos": [{"id": 1}]}), transport);

    let response = client
        .delete("todos", &q(json!({"id": 1})), &WriteOptions::new())
        .await
        .unwrap();
    assert_eq!(response, json!({"count": 3}));
}

#[tokio::test]
async fn empty_create_response_keeps_attributes() {
    let client = client(json!({"todos": []}), MockTransport::new());

    let created = client
        .create("todos", json!({"title": "offline"}), &WriteOptions::new())
        .await
        .unwrap();

    assert_eq!(created, json!({"title": "offline"}));
    assert_eq!(
        client.cache().read("todos").unwrap(),
        json!([{"title": "offline"}])
    );
}

#[tokio::test]
async fn empty_wait_create_response_keeps_attributes() {
    let client = client(json!({"todos": [{"id": 1}]}), MockTransport::new());

    let created = client
        .create("todos", json!({"title": "x"}), &WriteOptions::wait())
        .await
        .unwrap();

    assert_eq!(created, json!({"title": "x"}));
    assert_eq!(
        client.cache().read("todos").unwrap(),
        json!([{"id": 1}, {"title": "x"}])
    );
}

#[tokio::test]
async fn empty_find_all_response_leaves_cache_alone() {
    let client = client(json!({"todos": []}), MockTransport::new());

    let records = client
        .find_all("todos", &Query::new(), &HttpOptions::new())
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(client.cache().read("todos").unwrap(), json!([]));
}

#[tokio::test]
async fn error_details_survive_rollback() {
    let error = TransportError::http(422, "Unprocessable Entity", json!({"title": ["blank"]}))
        .with_headers([("x-request-id".to_string(), "abc".to_string())].into());
    let transport = MockTransport::new().fail(error.clone());
    let client = client(json!({"todos": []}), transport);

    let err = client
        .create("todos", json!({"title": ""}), &WriteOptions::new())
        .await
        .unwrap_err();

    let surfaced = err.as_transport().unwrap();
    assert_eq!(surfaced, &error);
    assert_eq!(surfaced.headers.get("x-request-id").unwrap(), "abc");
}

// ============================================================================
// Repeated Operations
// ============================================================================

#[tokio::test]
async fn many_creates_settle_independently() {
    let mut transport = MockTransport::new();
    for i in 0..20 {
        transport = if i % 2 == 0 {
            transport.ok(json!({"id": i, "n": i}))
        } else {
            transport.fail(TransportError::network("offline"))
        };
    }
    let client = client(json!({"todos": []}), transport);

    let mut confirmed = 0;
    for i in 0..20 {
        if client
            .create("todos", json!({"n": i}), &WriteOptions::new())
            .await
            .is_ok()
        {
            confirmed += 1;
        }
    }

    assert_eq!(confirmed, 10);
    let cached = client.cache().read("todos").unwrap();
    let cached = cached.as_array().unwrap();
    assert_eq!(cached.len(), 10);
    assert!(cached.iter().all(|r| r.get(CID_FIELD).is_none()));
    assert!(cached.iter().all(|r| r["id"] == r["n"]));
}

// ============================================================================
// Reconciliation Properties
// ============================================================================

fn records(ids: &[u8]) -> Vec<Value> {
    ids.iter().map(|id| json!({"id": id, "v": id})).collect()
}

proptest! {
    #[test]
    fn update_all_leaves_exactly_the_incoming_ids(
        current in prop::collection::btree_set(0u8..40, 0..20),
        incoming in prop::collection::btree_set(0u8..40, 1..20),
    ) {
        let current: Vec<u8> = current.into_iter().collect();
        let incoming: Vec<u8> = incoming.into_iter().collect();
        let mut cache = ObjectCache::new(json!({"todos": records(&current)}));

        let result = cache
            .update_all("todos", "id", records(&incoming), UpdateOptions::merge())
            .unwrap();

        let mut ids: Vec<u8> = result
            .iter()
            .map(|r| r["id"].as_u64().unwrap() as u8)
            .collect();
        ids.sort_unstable();
        prop_assert_eq!(ids, incoming);
    }

    #[test]
    fn rollback_restores_the_collection(
        current in prop::collection::btree_set(0u8..40, 1..20),
        pick in any::<prop::sample::Index>(),
    ) {
        let current: Vec<u8> = current.into_iter().collect();
        let before = json!({"todos": records(&current)});
        let id = current[pick.index(current.len())];
        let mut cache = ObjectCache::new(before.clone());

        let pending = Pending::update(
            &mut cache,
            "todos",
            "id",
            json!(id),
            json!({"id": id, "v": "tentative"}),
        )
        .unwrap();
        pending.rollback(&mut cache).unwrap();

        prop_assert_eq!(cache.store(), &before);
    }
}
