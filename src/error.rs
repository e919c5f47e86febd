//! Error types for docstore
//!
//! Provides a unified error type for all operations.

use std::fmt;

use thiserror::Error;

/// Result type alias using DocstoreError
pub type Result<T> = std::result::Result<T, DocstoreError>;

/// Error raised by a backing engine, surfaced verbatim
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The datastore operation that produced a storage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Bootstrap,
    Create,
    Update,
    Get,
    Count,
    Filter,
    Relation,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Bootstrap => "bootstrap",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Get => "get",
            Operation::Count => "count",
            Operation::Filter => "filter",
            Operation::Relation => "relation",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Unified error type for docstore operations
#[derive(Debug, Error)]
pub enum DocstoreError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage failure during {op}: {source}")]
    Storage {
        op: Operation,
        #[source]
        source: BackendError,
    },

    #[error("Identity generation failed: {0}")]
    IdentityGeneration(String),

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Invalid collection name: {0:?}")]
    InvalidCollectionName(String),

    #[error("Payload key {0:?} shadows a reserved column")]
    ReservedKey(String),

    #[error("Missing value for query parameter :{0}")]
    MissingParameter(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DocstoreError {
    /// Wrap a backend failure, tagged with the operation that produced it
    pub fn storage(op: Operation, source: impl Into<BackendError>) -> Self {
        DocstoreError::Storage {
            op,
            source: source.into(),
        }
    }

    /// True when the document is absent (as opposed to the operation failing)
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocstoreError::NotFound { .. })
    }

    /// True for failures reported by the backing engine
    pub fn is_storage(&self) -> bool {
        matches!(self, DocstoreError::Storage { .. })
    }
}
