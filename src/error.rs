//! Error types for the saved-document controller and its store backends.
//!
//! [`StoreError`] covers every failure a store backend can produce.
//! [`PanelError`] is what controller operations report: either a store
//! failure or a validation failure caught before any store access.
//! Both are surfaced to the view as a [`Notice`](crate::observer::Notice).

use thiserror::Error;

/// A failure inside a store backend.
///
/// The gateway never retries; the caller decides what to do with it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with the given id exists.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The supplied `_rev` does not match the stored revision.
    #[error("document update conflict: {id}")]
    Conflict { id: String },

    /// The document cannot be stored as given (e.g. empty `_id`).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored body could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend failure, described by the backend.
    #[error("store error: {0}")]
    Backend(String),
}

/// Failure of a controller operation.
#[derive(Debug, Error)]
pub enum PanelError {
    /// A gateway call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation was invoked with empty or invalid input.
    #[error("{0}")]
    Validation(String),
}

/// Coarse classification used by the view to pick how to show an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Store,
    Validation,
}

impl PanelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PanelError::Store(_) => ErrorKind::Store,
            PanelError::Validation(_) => ErrorKind::Validation,
        }
    }
}

/// Result alias for store backends.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
