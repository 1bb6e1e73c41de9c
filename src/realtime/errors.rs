//! # Real-Time Errors
//!
//! Error types for the live broadcast hub and observer connections.

use thiserror::Error;

/// Result type for real-time operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Real-time errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// Connection opened without declaring a form of interest
    #[error("missing formId")]
    MissingFormId,

    /// Event could not be encoded for the wire
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RealtimeError {
    /// Returns the close code for WebSocket
    pub fn close_code(&self) -> u16 {
        match self {
            RealtimeError::MissingFormId => 4000,
            RealtimeError::InvalidMessage(_) => 1003,
            RealtimeError::Internal(_) => 4500,
        }
    }
}
