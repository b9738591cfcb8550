//! Error types for slotbook.

use thiserror::Error;

/// Common error type for slotbook.
#[derive(Error, Debug)]
pub enum SlotbookError {
    /// Database error.
    ///
    /// This is a generic database error that wraps errors from any database backend.
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential error (tampered or structurally broken token).
    #[error("credential error: {0}")]
    Credential(#[from] crate::auth::CredentialError),

    /// Entitlement check error. Never downgraded: a degraded license
    /// subsystem must not silently grant or deny access.
    #[error("entitlement error: {0}")]
    Entitlement(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for SlotbookError {
    fn from(e: sqlx::Error) -> Self {
        SlotbookError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for SlotbookError {
    fn from(e: serde_json::Error) -> Self {
        SlotbookError::Serialization(e.to_string())
    }
}

/// Result type alias for slotbook operations.
pub type Result<T> = std::result::Result<T, SlotbookError>;
