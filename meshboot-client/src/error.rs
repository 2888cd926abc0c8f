//! Error types for the rendezvous client

use meshboot_core::codec::FrameError;
use std::io;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during the registration handshake
///
/// Every variant is fatal: the handshake is never retried at this layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The coordinator could not be reached
    #[error("failed to connect to coordinator at {address}: {source}")]
    Connect {
        /// Coordinator address as given
        address: String,
        #[source]
        source: io::Error,
    },

    /// Reading or writing the connection failed
    #[error("I/O error during registration: {0}")]
    Io(#[from] io::Error),

    /// The coordinator closed the connection before responding
    #[error("coordinator closed the connection before responding")]
    ConnectionClosed,

    /// The response frame announced more bytes than allowed
    #[error("response frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// The response is not a well-formed registration response
    #[error("malformed registration response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The acknowledgement could not be delivered
    #[error("failed to acknowledge registration: {0}")]
    Acknowledge(#[source] io::Error),
}

impl ClientError {
    /// Check if the coordinator answered with something that is not a valid response
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::FrameTooLarge { .. })
    }
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(e) => Self::Io(e),
            FrameError::Closed => Self::ConnectionClosed,
            FrameError::TooLarge { len, max } => Self::FrameTooLarge { len, max },
            FrameError::Payload(e) => Self::Decode(e),
        }
    }
}
