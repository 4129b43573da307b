//! [`Transport`] over `reqwest`.

use crate::config::{ConfigError, HttpConfig};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use ripple_engine::{Headers, Params, Transport, TransportError};
use serde_json::Value;

/// Sends engine requests to a REST API.
///
/// `find` is a GET with query parameters; `create`, `update` and `delete`
/// are POST, PUT and DELETE with a JSON body. Relative URLs are joined onto
/// the configured base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    /// Build a transport and its HTTP client from `config`.
    pub fn new(config: &HttpConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Build a transport from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&HttpConfig::from_env()?)
    }

    /// Use an existing client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    /// The absolute URL for `url`.
    pub fn endpoint(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        params: &Params,
        headers: &Headers,
    ) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.endpoint(url))
            .query(&query_pairs(params));

        let has_auth = headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(header::AUTHORIZATION.as_str()));
        if let (Some(token), false) = (&self.auth_token, has_auth) {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, TransportError> {
        let response = builder.send().await.map_err(|err| {
            tracing::debug!(error = %err, "Request failed before a response");
            TransportError::network(err.to_string())
        })?;
        read_response(response).await
    }
}

impl Transport for HttpTransport {
    async fn find(
        &self,
        url: &str,
        params: &Params,
        headers: &Headers,
    ) -> Result<Value, TransportError> {
        self.send(self.request(Method::GET, url, params, headers)).await
    }

    async fn create(
        &self,
        url: &str,
        data: &Value,
        params: &Params,
        headers: &Headers,
    ) -> Result<Value, TransportError> {
        self.send(self.request(Method::POST, url, params, headers).json(data))
            .await
    }

    async fn update(
        &self,
        url: &str,
        data: &Value,
        params: &Params,
        headers: &Headers,
    ) -> Result<Value, TransportError> {
        self.send(self.request(Method::PUT, url, params, headers).json(data))
            .await
    }

    async fn delete(
        &self,
        url: &str,
        data: &Value,
        params: &Params,
        headers: &Headers,
    ) -> Result<Value, TransportError> {
        self.send(self.request(Method::DELETE, url, params, headers).json(data))
            .await
    }
}

/// Query parameters as strings. String values are sent unquoted.
fn query_pairs(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect()
}

async fn read_response(response: Response) -> Result<Value, TransportError> {
    let status = response.status();
    let headers: Headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let url = response.url().to_string();

    let body = response
        .text()
        .await
        .map_err(|err| TransportError::network(err.to_string()))?;
    let data = parse_body(&body);

    tracing::debug!(url = %url, status = status.as_u16(), "Response received");

    if status.is_success() {
        Ok(data)
    } else {
        let reason = status.canonical_reason().unwrap_or_default();
        Err(TransportError::http(status.as_u16(), reason, data).with_headers(headers))
    }
}

/// Empty bodies are `null`; bodies that are not JSON are kept as a string.
fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
