//! Storage errors
//!
//! Error codes:
//! - FORM_NOT_FOUND / FORM_NOT_PUBLISHED: lookup failures, surfaced to callers
//! - DUPLICATE_FIELD: form content rejected on create/update
//! - PAYLOAD_TOO_LARGE: a response exceeds the log's frame limit, nothing written
//! - STORE_READ_ONLY: mutation attempted through a read-only handle
//! - STORAGE_IO_ERROR / STORAGE_CORRUPTED / STORAGE_SERIALIZATION / STORAGE_INTERNAL:
//!   engine failures, reported as internal errors

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Form not found: {0}")]
    FormNotFound(String),

    #[error("Form not published: {0}")]
    FormNotPublished(String),

    #[error("Duplicate field id: {0}")]
    DuplicateField(String),

    #[error("Payload of {len} bytes exceeds the {max} byte frame limit")]
    PayloadTooLarge { len: usize, max: u32 },

    #[error("Store opened read-only: {0}")]
    ReadOnly(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupted record at offset {offset}: {reason}")]
    Corrupted { offset: u64, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Wrap an I/O failure with context
    pub fn io(context: impl AsRef<str>, err: std::io::Error) -> Self {
        StorageError::Io(format!("{}: {}", context.as_ref(), err))
    }

    /// Returns the machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::FormNotFound(_) => "FORM_NOT_FOUND",
            StorageError::FormNotPublished(_) => "FORM_NOT_PUBLISHED",
            StorageError::DuplicateField(_) => "DUPLICATE_FIELD",
            StorageError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            StorageError::ReadOnly(_) => "STORE_READ_ONLY",
            StorageError::Io(_) => "STORAGE_IO_ERROR",
            StorageError::Corrupted { .. } => "STORAGE_CORRUPTED",
            StorageError::Serialization(_) => "STORAGE_SERIALIZATION",
            StorageError::Internal(_) => "STORAGE_INTERNAL",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            StorageError::FormNotFound(_) | StorageError::FormNotPublished(_) => 404,
            StorageError::DuplicateField(_) => 400,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
