//! Error types for the events crate.

use thiserror::Error;

/// Result type alias for event operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Event error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The receiving side of the event channel is gone.
    #[error("event channel closed")]
    ChannelClosed,

    /// A client frame could not be decoded.
    #[error("invalid message: {reason}")]
    InvalidMessage { reason: String },

    /// A frame could not be encoded.
    #[error("serialization failed: {reason}")]
    Serialization { reason: String },
}

impl Error {
    /// Create an invalid message error.
    pub fn invalid_message(reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }
}
