//! Resolution of a cache path and action into a concrete request.
//!
//! [`resolve`] combines a path's [`Mapping`](crate::Mapping) with the
//! caller's query and options. The URL is expanded on demand from a template
//! whose `:name` segments are filled from the query, then from any
//! option keys the resolver does not recognise. Whatever is not consumed by
//! the template is sent as query-string parameters.

use crate::error::{Error, Result};
use crate::mapping::{Mappings, ResponseTransform};
use crate::path;
use crate::query::Query;
use crate::transport::{Headers, Params};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The remote action a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Find,
    FindAll,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Actions addressing a single record get an identifier segment.
    pub fn targets_record(self) -> bool {
        matches!(self, Action::Find | Action::Update | Action::Delete)
    }
}

/// Per-call HTTP options.
///
/// Keys other than `headers`, `params` and `force` land in `extra` and are
/// folded into route or query parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpOptions {
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub params: Params,
    /// Skip the cache and replace it with the response
    #[serde(default)]
    pub force: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HttpOptions {
    /// Options with no headers, params or extra keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add an explicit query-string parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Bypass the cache on reads.
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Add a route/query value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// A fully resolved request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    template: String,
    route: Map<String, Value>,
    /// Query-string parameters
    pub params: Params,
    /// Request headers
    pub headers: Headers,
    /// Bypass the cache
    pub force: bool,
    /// The caller's query
    pub query: Query,
    /// Identifier field for the path
    pub identifier: String,
    transform: ResponseTransform,
}

impl RequestDescriptor {
    /// The expanded URL.
    pub fn url(&self) -> String {
        expand(&self.template, &self.route)
    }

    /// Address the record identified by `id` even when the caller's query
    /// selected it by other fields.
    pub fn bind_identifier(&mut self, id: &Value) {
        if !self.route.contains_key(&self.identifier) {
            self.route.insert(self.identifier.clone(), id.clone());
        }
        self.params.remove(&self.identifier);
    }

    /// Run the response transform pipeline.
    pub fn transform(&self, data: Value) -> Value {
        self.transform.apply(data)
    }
}

/// Resolve `path` and `action` against `mappings`.
pub fn resolve(
    mappings: &Mappings,
    path: &str,
    action: Action,
    query: &Query,
    options: &HttpOptions,
) -> Result<RequestDescriptor> {
    if mappings.is_empty() {
        return Err(Error::MissingMappings);
    }
    if path.is_empty() {
        return Err(Error::MissingPath);
    }
    let key = path::root(path);
    let mapping = mappings
        .get(key)
        .ok_or_else(|| Error::UnknownPath(key.to_string()))?;

    let template = if action.targets_record() {
        format!("{}/:{}", mapping.url.trim_end_matches('/'), mapping.identifier)
    } else {
        mapping.url.clone()
    };

    let mut route = options.extra.clone();
    route.extend(query.iter().map(|(k, v)| (k.clone(), v.clone())));

    let placeholders = placeholders(&template);
    let mut params: Params = route
        .iter()
        .filter(|(name, _)| !placeholders.iter().any(|p| p == *name))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    params.extend(options.params.clone());

    Ok(RequestDescriptor {
        template,
        route,
        params,
        headers: options.headers.clone(),
        force: options.force,
        query: query.clone(),
        identifier: mapping.identifier.clone(),
        transform: mapping.response_transform(),
    })
}

/// Split a segment into its placeholder name and trailing text, if it is a
/// placeholder.
fn placeholder(segment: &str) -> Option<(&str, &str)> {
    let rest = segment.strip_prefix(':')?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let name = &rest[..end];
    let starts_well = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well.then(|| (name, &rest[end..]))
}

/// Names of all placeholders in `template`.
pub fn placeholders(template: &str) -> Vec<String> {
    template
        .split('/')
        .filter_map(placeholder)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Fill `template`'s placeholders from `values`.
///
/// A placeholder with no (or a null) value is dropped along with its
/// leading slash.
pub fn expand(template: &str, values: &Map<String, Value>) -> String {
    let mut segments: Vec<String> = Vec::new();
    for segment in template.split('/') {
        match placeholder(segment) {
            Some((name, suffix)) => match values.get(name).filter(|v| !v.is_null()) {
                Some(value) => {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    segments.push(format!("{}{}", urlencoding::encode(&text), suffix));
                }
                None => continue,
            },
            None => segments.push(segment.to_string()),
        }
    }
    segments.join("/")
}
