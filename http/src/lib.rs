//! # Ripple HTTP
//!
//! The HTTP side of Ripple: a [`Transport`](ripple_engine::Transport) that
//! talks to a REST API with `reqwest`, configured from the environment.
//!
//! ```rust,no_run
//! use ripple_engine::{Mapping, Mappings, ObjectCache, SyncClient};
//! use ripple_http::HttpTransport;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // RIPPLE_BASE_URL=https://api.example.com
//! let transport = HttpTransport::from_env()?;
//! let mappings = Mappings::new().with("todos", Mapping::new("/todos"));
//! let client = SyncClient::new(mappings, ObjectCache::new(json!({"todos": []})), transport)?;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod transport;

pub use config::{ConfigError, HttpConfig, DEFAULT_TIMEOUT_SECS};
pub use transport::HttpTransport;
