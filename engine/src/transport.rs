//! Transport adapter contract.
//!
//! The engine never performs IO itself. Network access goes through a
//! [`Transport`], a four-verb contract mirroring the REST actions the
//! synchronization core issues. Implementations translate every failure
//! (connection errors, non-success statuses) into a [`TransportError`] that
//! keeps the raw response details so callers can inspect them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;

/// Request headers, name to value.
pub type Headers = BTreeMap<String, String>;

/// Query-string parameters.
pub type Params = Map<String, Value>;

/// A failed transport call.
///
/// Carries whatever the HTTP layer observed: the status line, response
/// headers and the (parsed) response body. Connection-level failures have no
/// status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct TransportError {
    /// HTTP status code, if a response was received
    pub status: Option<u16>,
    /// HTTP reason phrase
    pub status_text: String,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub data: Value,
    /// Human readable summary
    pub message: String,
}

impl TransportError {
    /// A failure carrying an HTTP response.
    pub fn http(status: u16, status_text: impl Into<String>, data: Value) -> Self {
        let status_text = status_text.into();
        Self {
            status: Some(status),
            message: format!("request failed with status {status} {status_text}"),
            status_text,
            headers: Headers::new(),
            data,
        }
    }

    /// A failure before any response was received.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            status_text: String::new(),
            headers: Headers::new(),
            data: Value::Null,
            message: message.into(),
        }
    }

    /// Attach response headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }
}

/// The HTTP side of synchronization.
///
/// Each method resolves to the parsed response body. Errors are never
/// retried by the engine; they trigger compensation and are handed back to
/// the caller unchanged.
pub trait Transport: Send + Sync {
    /// Fetch a record or collection.
    fn find(
        &self,
        url: &str,
        params: &Params,
        headers: &Headers,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;

    /// Create a record.
    fn create(
        &self,
        url: &str,
        data: &Value,
        params: &Params,
        headers: &Headers,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;

    /// Update a record.
    fn update(
        &self,
        url: &str,
        data: &Value,
        params: &Params,
        headers: &Headers,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;

    /// Delete a record.
    fn delete(
        &self,
        url: &str,
        data: &Value,
        params: &Params,
        headers: &Headers,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn http_error_details() {
        let mut headers = Headers::new();
        headers.insert("x-request-id".into(), "abc".into());

        let err = TransportError::http(422, "Unprocessable Entity", json!({"title": "blank"}))
            .with_headers(headers.clone());

        assert_eq!(err.status, Some(422));
        assert_eq!(err.status_text, "Unprocessable Entity");
        assert_eq!(err.headers, headers);
        assert_eq!(err.data, json!({"title": "blank"}));
        assert_eq!(
            err.to_string(),
            "request failed with status 422 Unprocessable Entity"
        );
    }

    #[test]
    fn network_error_has_no_status() {
        let err = TransportError::network("connection refused");
        assert_eq!(err.status, None);
        assert_eq!(err.data, Value::Null);
        assert_eq!(err.to_string(), "connection refused");
    }
}
