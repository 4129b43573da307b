//! Dotted path resolution inside a nested JSON tree.
//!
//! A path such as `"todos.deep.nested"` names a location by walking object
//! keys. Paths never index into arrays; records inside a collection are
//! located with the [`query`](crate::query) matcher instead.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Split a path into its segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.')
}

/// The leading segment of a path, which selects the mapping entry.
pub fn root(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// Read the value at `path`.
///
/// Every segment must already exist.
pub fn read<'a>(store: &'a Value, path: &str) -> Result<&'a Value> {
    let mut current = store;
    for segment in segments(path) {
        current = object(current, segment, path)?
            .get(segment)
            .ok_or_else(|| not_found(segment, path))?;
    }
    Ok(current)
}

/// Mutable access to the value at `path`.
pub fn read_mut<'a>(store: &'a mut Value, path: &str) -> Result<&'a mut Value> {
    let mut current = store;
    for segment in segments(path) {
        current = object_mut(current, segment, path)?
            .get_mut(segment)
            .ok_or_else(|| not_found(segment, path))?;
    }
    Ok(current)
}

/// Write `value` at `path`, returning the previous value (or `Null`).
///
/// The terminal segment is created when absent. Missing intermediate
/// segments are initialised to empty objects; a segment that exists but is
/// not an object is an error.
pub fn write(store: &mut Value, path: &str, value: Value) -> Result<Value> {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, path),
    };

    let mut current = store;
    if let Some(parent) = parent {
        for segment in segments(parent) {
            current = object_mut(current, segment, path)?
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }

    let previous = object_mut(current, last, path)?.insert(last.to_string(), value);
    Ok(previous.unwrap_or(Value::Null))
}

fn object<'a>(value: &'a Value, segment: &str, path: &str) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| Error::NotAContainer {
        segment: segment.to_string(),
        path: path.to_string(),
    })
}

fn object_mut<'a>(
    value: &'a mut Value,
    segment: &str,
    path: &str,
) -> Result<&'a mut Map<String, Value>> {
    value.as_object_mut().ok_or_else(|| Error::NotAContainer {
        segment: segment.to_string(),
        path: path.to_string(),
    })
}

fn not_found(segment: &str, path: &str) -> Error {
    Error::PathNotFound {
        segment: segment.to_string(),
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_nested() {
        let store = json!({"todos": {"deep": {"nested": [{"id": 1}]}}});
        assert_eq!(
            read(&store, "todos.deep.nested").unwrap(),
            &json!([{"id": 1}])
        );
        assert_eq!(read(&store, "todos").unwrap()["deep"]["nested"][0]["id"], 1);
    }

    #[test]
    fn read_missing_segment_names_it() {
        let store = json!({"todos": {}});
        let err = read(&store, "todos.deep.nested").unwrap_err();
        assert_eq!(
            err,
            Error::PathNotFound {
                segment: "deep".into(),
                path: "todos.deep.nested".into(),
            }
        );
    }

    #[test]
    fn read_through_array_fails() {
        let store = json!({"todos": [{"id": 1}]});
        let err = read(&store, "todos.0").unwrap_err();
        assert!(matches!(err, Error::NotAContainer { segment, .. } if segment == "0"));
    }

    #[test]
    fn write_replaces_and_returns_previous() {
        let mut store = json!({"todo": {"id": 1}});
        let previous = write(&mut store, "todo", json!({"id": 2})).unwrap();
        assert_eq!(previous, json!({"id": 1}));
        assert_eq!(store, json!({"todo": {"id": 2}}));
    }

    #[test]
    fn write_initialises_missing_intermediates() {
        let mut store = json!({});
        let previous = write(&mut store, "a.b.c", json!([])).unwrap();
        assert_eq!(previous, Value::Null);
        assert_eq!(store, json!({"a": {"b": {"c": []}}}));
    }

    #[test]
    fn write_through_scalar_fails() {
        let mut store = json!({"a": 5});
        assert!(matches!(
            write(&mut store, "a.b", json!(1)),
            Err(Error::NotAContainer { .. })
        ));
    }

    #[test]
    fn root_segment() {
        assert_eq!(root("todos.deep.nested"), "todos");
        assert_eq!(root("todos"), "todos");
    }
}
