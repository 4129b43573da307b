//! Partial-attribute matching of records.
//!
//! A query is an object of field/value pairs. A record matches when every
//! queried field is present and equal; extra fields on the record are
//! ignored. There are no operators.
//!
//! Both entry points report "nothing" as `None`. That includes a filter
//! whose every candidate was rejected: at this layer an empty match and an
//! absent collection look the same.

use serde_json::{Map, Value};

/// A partial-attribute query.
pub type Query = Map<String, Value>;

/// Does `record` satisfy every key of `query`?
pub fn matches(record: &Value, query: &Query) -> bool {
    let Some(fields) = record.as_object() else {
        return query.is_empty();
    };
    query
        .iter()
        .all(|(key, expected)| fields.get(key) == Some(expected))
}

/// Locate the record selected by `query`.
///
/// For a collection this is the first matching member; for a single record
/// it is the record itself when it matches. An empty query passes the
/// candidate through unchanged.
pub fn find<'a>(candidate: &'a Value, query: &Query) -> Option<&'a Value> {
    if is_blank(candidate) {
        return None;
    }
    if query.is_empty() {
        return Some(candidate);
    }
    match candidate {
        Value::Array(records) => records.iter().find(|r| matches(r, query)),
        record => matches(record, query).then_some(record),
    }
}

/// Position of the first member of `records` selected by `query`.
pub fn position(records: &[Value], query: &Query) -> Option<usize> {
    records.iter().position(|r| matches(r, query))
}

/// Every member of a collection matching `query`.
///
/// An empty query yields the whole collection. An empty result is `None`.
pub fn filter<'a>(records: &'a [Value], query: &Query) -> Option<Vec<&'a Value>> {
    let matched: Vec<&Value> = records.iter().filter(|r| matches(r, query)).collect();
    (!matched.is_empty()).then_some(matched)
}

/// Build a single-field query.
pub fn by_field(field: &str, value: Value) -> Query {
    let mut query = Query::new();
    query.insert(field.to_string(), value);
    query
}

/// Null, empty arrays and empty objects carry no data.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}
