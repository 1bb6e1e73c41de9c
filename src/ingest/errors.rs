//! Submission rejection reasons
//!
//! Every failure of `Ingestor::submit` is one of these, reported
//! synchronously to the caller. None are retried.

use thiserror::Error;

use crate::schema::ValidationError;
use crate::storage::StorageError;

/// Result type for submissions
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Why a submission was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Structurally invalid input, rejected before any store access
    #[error("malformed request: {0}")]
    Malformed(String),

    /// No form with this id
    #[error("form not found: {0}")]
    NotFound(String),

    /// The form exists but is still a draft
    #[error("form not published: {0}")]
    NotPublished(String),

    /// Answers do not satisfy the form's schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Persisting the response failed
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl SubmitError {
    /// Returns the machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::Malformed(_) => "MALFORMED_REQUEST",
            SubmitError::NotFound(_) => "NOT_FOUND",
            SubmitError::NotPublished(_) => "NOT_PUBLISHED",
            SubmitError::Validation(e) => e.kind().code(),
            SubmitError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            SubmitError::Malformed(_) | SubmitError::Validation(_) => 400,
            SubmitError::NotFound(_) | SubmitError::NotPublished(_) => 404,
            SubmitError::Storage(_) => 500,
        }
    }
}

impl From<StorageError> for SubmitError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::FormNotFound(id) => SubmitError::NotFound(id),
            StorageError::FormNotPublished(id) => SubmitError::NotPublished(id),
            other => SubmitError::Storage(other),
        }
    }
}
