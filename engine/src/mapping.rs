//! Per-path remote configuration.
//!
//! A [`Mapping`] ties a top-level cache path to its REST endpoint, the name
//! of the field identifying its records, and the transforms applied to
//! every response. Mappings are fixed once a client is built.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier field used when a mapping does not name one.
pub const DEFAULT_IDENTIFIER: &str = "id";

/// A response transform.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Remote configuration for one top-level path.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    /// URL template with `:param` placeholders
    pub url: String,
    /// Field holding each record's identifier
    #[serde(default = "default_identifier")]
    pub identifier: String,
    /// Strip single-key response envelopes before the custom transforms
    #[serde(default = "default_true")]
    pub default_transform: bool,
    #[serde(skip)]
    transforms: Vec<Transform>,
}

fn default_identifier() -> String {
    DEFAULT_IDENTIFIER.to_string()
}

fn default_true() -> bool {
    true
}

impl Mapping {
    /// Map a path to `url` with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            identifier: default_identifier(),
            default_transform: true,
            transforms: Vec::new(),
        }
    }

    /// Use `field` as the record identifier.
    pub fn identifier(mut self, field: impl Into<String>) -> Self {
        self.identifier = field.into();
        self
    }

    /// Append a response transform.
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(f));
        self
    }

    /// Do not strip response envelopes.
    pub fn without_default_transform(mut self) -> Self {
        self.default_transform = false;
        self
    }

    /// The composed transform pipeline for this mapping.
    pub fn response_transform(&self) -> ResponseTransform {
        ResponseTransform {
            unwrap_envelope: self.default_transform,
            transforms: self.transforms.clone(),
        }
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("url", &self.url)
            .field("identifier", &self.identifier)
            .field("default_transform", &self.default_transform)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

/// Transforms applied, in order, to every response for a path.
#[derive(Clone, Default)]
pub struct ResponseTransform {
    unwrap_envelope: bool,
    transforms: Vec<Transform>,
}

impl ResponseTransform {
    /// Run the pipeline.
    pub fn apply(&self, data: Value) -> Value {
        let data = if self.unwrap_envelope {
            unwrap_envelope(data)
        } else {
            data
        };
        self.transforms.iter().fold(data, |acc, f| f(acc))
    }
}

impl fmt::Debug for ResponseTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseTransform")
            .field("unwrap_envelope", &self.unwrap_envelope)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

/// Drop a single-key envelope: `{"todo": {...}}` becomes `{...}`.
///
/// Only objects and arrays are unwrapped; `{"id": 3}` is a record, not an
/// envelope.
pub fn unwrap_envelope(data: Value) -> Value {
    match data {
        Value::Object(fields)
            if fields.len() == 1 && fields.values().all(|v| v.is_object() || v.is_array()) =>
        {
            fields
                .into_iter()
                .next()
                .map(|(_, inner)| inner)
                .unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Mappings for every top-level path a client serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mappings {
    entries: HashMap<String, Mapping>,
}

impl Mappings {
    /// Create an empty set of mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse mappings from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Builder-style insert.
    pub fn with(mut self, path: impl Into<String>, mapping: Mapping) -> Self {
        self.insert(path, mapping);
        self
    }

    /// Add or replace the mapping for `path`.
    pub fn insert(&mut self, path: impl Into<String>, mapping: Mapping) {
        self.entries.insert(path.into(), mapping);
    }

    /// Mapping for a top-level path.
    pub fn get(&self, path: &str) -> Option<&Mapping> {
        self.entries.get(path)
    }

    /// Whether no paths are mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
