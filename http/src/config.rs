//! Configuration for the HTTP transport.

use std::env;
use std::time::Duration;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Transport configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    /// Base URL that relative mapping URLs are joined onto
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
}

impl HttpConfig {
    /// Configuration for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            auth_token: None,
        }
    }

    /// Send `token` as a bearer `Authorization` header.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Override the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first, if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("RIPPLE_BASE_URL").ok_or(ConfigError::MissingBaseUrl)?;

        let timeout = lookup("RIPPLE_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let auth_token = lookup("RIPPLE_AUTH_TOKEN").filter(|token| !token.is_empty());

        Ok(Self {
            base_url,
            timeout,
            auth_token,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RIPPLE_BASE_URL environment variable is required")]
    MissingBaseUrl,

    #[error("Invalid RIPPLE_TIMEOUT_SECS value")]
    InvalidTimeout,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
