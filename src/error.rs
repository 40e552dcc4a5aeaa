//! Courier runtime error types

use tokio_util::codec::LinesCodecError;

use crate::protocol::{MAX_ENVELOPE_BYTES, ProtocolError};

/// Courier runtime error types
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    // Per-request errors, answered with an error response
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server answered the call with `{"error": ...}`.
    #[error("remote error: {0}")]
    Remote(String),

    // Per-connection errors (timeouts, resets); only the affected connection ends
    #[error("connection error: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Fatal before the server starts serving
    #[error("startup failed: {0}")]
    Startup(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Whether this error ends only the connection it happened on.
    pub fn is_connection_scoped(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Io(_))
    }
}

impl From<LinesCodecError> for CourierError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => {
                CourierError::Protocol(ProtocolError::EnvelopeTooLarge {
                    limit: MAX_ENVELOPE_BYTES,
                })
            }
            LinesCodecError::Io(e) => CourierError::Io(e),
        }
    }
}

/// Result type alias for Courier operations
pub type Result<T> = std::result::Result<T, CourierError>;
