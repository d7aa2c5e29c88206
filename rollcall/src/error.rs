//! Top-level error type

use rollcall_client::ClientError;
use rollcall_media::MediaError;
use thiserror::Error;

/// Errors surfaced by the session and CLI
#[derive(Error, Debug)]
pub enum RollcallError {
    /// Recording, decoding or sampling failed
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Talking to the attendance service failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Operation not allowed in the current session state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },
}

/// Result type for session operations
pub type RollcallResult<T> = Result<T, RollcallError>;

impl RollcallError {
    /// Whether the user can retry the failed step
    pub fn is_recoverable(&self) -> bool {
        match self {
            RollcallError::Media(e) => e.is_recoverable(),
            RollcallError::Client(e) => e.is_recoverable(),
            RollcallError::InvalidState { .. } => true,
            RollcallError::Configuration { .. } => false,
        }
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        RollcallError::InvalidState {
            message: message.into(),
        }
    }
}
