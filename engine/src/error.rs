//! Error types for the Ripple engine.

use crate::transport::TransportError;
use thiserror::Error;

/// All possible errors from the Ripple engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Configuration errors
    #[error("no path mappings configured")]
    MissingMappings,

    #[error("no path given")]
    MissingPath,

    #[error("no mapping configured for path: {0}")]
    UnknownPath(String),

    // Lookup errors
    #[error("path segment '{segment}' not found in path: {path}")]
    PathNotFound { segment: String, path: String },

    #[error("path segment '{segment}' in path {path} does not hold an object")]
    NotAContainer { segment: String, path: String },

    // Precondition errors
    #[error("a non-empty query is required to get a record at path: {0}")]
    EmptyQuery(String),

    #[error("data at path {0} is not a collection")]
    NotACollection(String),

    #[error("cannot insert an array into non-collection path: {0}")]
    ArrayIntoRecord(String),

    #[error("cannot update path {0} with array attributes")]
    ArrayAttributes(String),

    #[error("attributes for path {0} must be an object")]
    NotARecord(String),

    #[error("cannot reconcile path {0} with an empty collection")]
    EmptyCollection(String),

    #[error("no item carries the identifier '{identifier}' for path: {path}")]
    MissingIdentifier { path: String, identifier: String },

    #[error("No data to delete at path: {path} with query: {query}")]
    NoDataToDelete { path: String, query: String },

    // Mutation errors
    #[error("no record matching {query} at path: {path}")]
    RecordNotFound { path: String, query: String },

    // Network errors, carried unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// The transport failure behind this error, if it came from the network.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
