//! Scripted transport shared by the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use ripple_engine::{Headers, Params, Transport, TransportError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// A request the transport received.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub verb: &'static str,
    pub url: String,
    pub data: Option<Value>,
    pub params: Params,
    pub headers: Headers,
}

/// Lets a test observe the world while a request is in flight.
#[derive(Debug, Default)]
pub struct Gate {
    pub started: Notify,
    pub release: Notify,
}

/// Replays queued responses in order. An empty queue answers `null`.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    calls: Mutex<Vec<Call>>,
    gate: Option<Arc<Gate>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, body: Value) -> Self {
        self.responses.lock().push_back(Ok(body));
        self
    }

    pub fn fail(self, err: TransportError) -> Self {
        self.responses.lock().push_back(Err(err));
        self
    }

    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    async fn reply(&self, call: Call) -> Result<Value, TransportError> {
        self.calls.lock().push(call);
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        let next = self.responses.lock().pop_front();
        next.unwrap_or(Ok(Value::Null))
    }
}

impl Transport for MockTransport {
    async fn find(
        &self,
        url: &str,
        params: &Params,
        headers: &Headers,
    ) -> Result<Value, TransportError> {
        self.reply(Call {
            verb: "find",
            url: url.to_string(),
            data: None,
            params: params.clone(),
            headers: headers.clone(),
        })
        .await
    }

    async fn create(
        &self,
        url: &str,
        data: &Value,
        params: &Params,
        headers: &Headers,
    ) -> Result<Value, TransportError> {
        self.reply(Call {
            verb: "create",
            url: url.to_string(),
            data: Some(data.clone()),
            params: params.clone(),
            headers: headers.clone(),
        })
        .await
    }

    async fn update(
        &self,
        url: &str,
        data: &Value,
        params: &Params,
        headers: &Headers,
    ) -> Result<Value, TransportError> {
        self.reply(Call {
            verb: "update",
            url: url.to_string(),
            data: Some(data.clone()),
            params: params.clone(),
            headers: headers.clone(),
        })
        .await
    }

    async fn delete(
        &self,
        url: &str,
        data: &Value,
        params: &Params,
        headers: &Headers,
    ) -> Result<Value, TransportError> {
        self.reply(Call {
            verb: "delete",
            url: url.to_string(),
            data: Some(data.clone()),
            params: params.clone(),
            headers: headers.clone(),
        })
        .await
    }
}

/// Install a test log subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a query from a JSON object literal.
pub fn q(value: Value) -> ripple_engine::Query {
    value.as_object().cloned().unwrap_or_default()
}
