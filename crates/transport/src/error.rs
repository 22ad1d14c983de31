use std::time::Duration;

use thiserror::Error;

/// Failures raised by a transport while moving request and response messages.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The peer could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The encoded message exceeds what the transport is willing to carry.
    #[error("message of {size} bytes exceeds maximum of {max} bytes")]
    MessageTooLarge {
        /// Size of the rejected message.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The message could not be handed to the peer.
    #[error("failed to send message: {0}")]
    SendError(String),

    /// Sending did not complete in time.
    #[error("timed out sending message after {0:?}")]
    SendTimeout(Duration),

    /// A response could not be read.
    #[error("failed to receive message: {0}")]
    ReceiveError(String),

    /// No response arrived in time.
    #[error("timed out waiting for message after {0:?}")]
    ReceiveTimeout(Duration),

    /// The caller's deadline for the whole round trip expired.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Whether this failure is one of the timeout conditions.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::SendTimeout(_) | Self::ReceiveTimeout(_) | Self::Timeout(_)
        )
    }
}
