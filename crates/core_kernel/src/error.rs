//! Store error taxonomy shared by every back-end
//!
//! Store-originated failures are categorised, never retried and never
//! swallowed. A lookup that finds nothing is not an error; it is reported as
//! `Ok(None)` by the repository.

use thiserror::Error;

/// Result alias used across the repository layer
pub type StoreResult<T> = Result<T, StoreError>;

/// Why a write was rejected by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorKind {
    /// A document with the same identifier already exists
    DuplicateKey,
    /// Any other integrity constraint was violated
    Constraint,
    /// The entity could not be turned into a storable document
    Serialization,
    /// The store refused the write for another reason
    Rejected,
}

/// Errors surfaced by collections and repositories
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable or the connection was lost
    #[error("Store connectivity error: {message}")]
    Connectivity { message: String },

    /// An insert, replace or delete was rejected
    #[error("Store write error ({kind:?}): {message}")]
    Write {
        kind: WriteErrorKind,
        message: String,
    },

    /// A read failed inside the store
    #[error("Store query error: {message}")]
    Query { message: String },

    /// A stored document could not be decoded into the entity type
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// The collection name cannot be used by the store
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    /// Store configuration could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller cancelled the operation before it completed
    #[error("Operation '{operation}' was cancelled")]
    Cancelled { operation: &'static str },
}

impl StoreError {
    pub fn connectivity(message: impl Into<String>) -> Self {
        StoreError::Connectivity {
            message: message.into(),
        }
    }

    pub fn write(kind: WriteErrorKind, message: impl Into<String>) -> Self {
        StoreError::Write {
            kind,
            message: message.into(),
        }
    }

    /// Creates a duplicate key error for a collection and identifier
    pub fn duplicate_key(collection: &str, id: impl std::fmt::Display) -> Self {
        StoreError::Write {
            kind: WriteErrorKind::DuplicateKey,
            message: format!("{} with id '{}' already exists", collection, id),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        StoreError::Query {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        StoreError::Decode {
            message: message.into(),
        }
    }

    pub fn cancelled(operation: &'static str) -> Self {
        StoreError::Cancelled { operation }
    }

    /// Returns true if the operation was cancelled by the caller
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled { .. })
    }

    /// Returns true if the store could not be reached
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connectivity { .. })
    }

    /// Returns true if a write was rejected
    pub fn is_write(&self) -> bool {
        matches!(self, StoreError::Write { .. })
    }

    /// Returns true if a write collided with an existing identifier
    pub fn is_duplicate_key(&self) -> bool {
        matches!(
            self,
            StoreError::Write {
                kind: WriteErrorKind::DuplicateKey,
                ..
            }
        )
    }
}
