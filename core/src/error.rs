//! Error types for the remote sync client.
//!
//! # Design
//! The backend contract makes no distinction between 4xx and 5xx, or between
//! a refused connection and a timeout: every failure is handled the same way
//! by the reconciliation layer. Variants exist only so the message that ends
//! up in the log says what went wrong.

use thiserror::Error;

/// Errors produced while building requests, executing them, or parsing
/// responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP error! status: {status}")]
    Http { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A write asked for the affected row back but the array was empty.
    #[error("response contained no record")]
    EmptyRepresentation,
}

impl ApiError {
    /// HTTP status of the failed call, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
