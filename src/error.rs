//! Error taxonomy shared by the repository, ingestion and alerting
//!
//! - `Validation`: malformed or out-of-range input, never retried
//! - `NotFound`: referenced asset/submodel/alert is absent
//! - `Conflict`: duplicate identifier or stale `last_modified`; re-read and retry
//! - `Storage`: persistence failure that survived the bounded retry loop

use thiserror::Error;

use crate::storage::StorageError;

pub type AasResult<T> = Result<T, AasError>;

#[derive(Debug, Error)]
pub enum AasError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(StorageError),
}

impl AasError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Short machine-readable tag, used by the HTTP adapter
    pub fn kind(&self) -> &'static str {
        match self {
            AasError::Validation(_) => "validation",
            AasError::NotFound(_) => "not_found",
            AasError::Conflict(_) => "conflict",
            AasError::Storage(_) => "storage",
        }
    }
}

impl From<StorageError> for AasError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Constraint(msg) => AasError::Conflict(msg),
            other => AasError::Storage(other),
        }
    }
}
