//! Database error types
//!
//! `DatabaseError` classifies raw SQLx failures by PostgreSQL SQLSTATE before
//! they are handed to callers as a categorised [`StoreError`].

use core_kernel::{StoreError, WriteErrorKind};
use thiserror::Error;

/// Errors that can occur during PostgreSQL operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Check, foreign key or not-null constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A column could not be decoded
    #[error("Decode error: {0}")]
    DecodeFailed(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

/// Whether the failing statement read or wrote data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl DatabaseError {
    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }

    /// Converts into the store taxonomy
    ///
    /// Failures of write statements that are not connectivity problems become
    /// `StoreError::Write`; failures of reads become `StoreError::Query`.
    pub fn into_store_error(self, access: Access) -> StoreError {
        match self {
            DatabaseError::ConnectionFailed(message) => StoreError::connectivity(message),
            DatabaseError::PoolExhausted => {
                StoreError::connectivity("connection pool exhausted")
            }
            DatabaseError::DuplicateEntry(message) => {
                StoreError::write(WriteErrorKind::DuplicateKey, message)
            }
            DatabaseError::ConstraintViolation(message) => {
                StoreError::write(WriteErrorKind::Constraint, message)
            }
            DatabaseError::DecodeFailed(message) => StoreError::decode(message),
            DatabaseError::QueryFailed(message) => match access {
                Access::Read => StoreError::query(message),
                Access::Write => StoreError::write(WriteErrorKind::Rejected, message),
            },
        }
    }
}

/// Converts SQLx errors to more specific DatabaseError variants
///
/// This function analyzes the SQLx error and maps it to the appropriate
/// DatabaseError variant based on the PostgreSQL error code.
impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => DatabaseError::ConnectionFailed(error.to_string()),
            sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => {
                DatabaseError::DecodeFailed(error.to_string())
            }
            sqlx::Error::Database(db_err) => {
                // PostgreSQL error codes
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry(db_err.message().to_string()),
                    Some(code) if code.starts_with("23") => {
                        DatabaseError::ConstraintViolation(db_err.message().to_string())
                    }
                    Some(code) if code.starts_with("08") => {
                        DatabaseError::ConnectionFailed(db_err.message().to_string())
                    }
                    _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::from(&error)
    }
}

pub(crate) fn read_error(error: sqlx::Error) -> StoreError {
    DatabaseError::from(&error).into_store_error(Access::Read)
}

pub(crate) fn write_error(error: sqlx::Error) -> StoreError {
    DatabaseError::from(&error).into_store_error(Access::Write)
}
