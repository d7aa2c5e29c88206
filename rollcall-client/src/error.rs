//! Client error types

use thiserror::Error;

/// Errors raised while talking to the attendance service
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure: connect, timeout, TLS or body read
    #[error("HTTP error: {source}")]
    Http {
        /// Underlying reqwest error
        #[from]
        source: reqwest::Error,
    },

    /// Base URL could not be used
    #[error("Invalid service URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Upload form is not well formed
    #[error("Invalid upload form: {message}")]
    InvalidForm {
        /// Error message
        message: String,
    },

    /// `/upload_video` answered with a status other than `success`
    #[error("Upload rejected with status {status:?}: {}", .message.as_deref().unwrap_or("no message"))]
    UploadRejected {
        /// Reported status
        status: String,
        /// Reported message
        message: Option<String>,
    },

    /// `/calc_attendance` answered with a status other than `completed`
    #[error("Attendance computation failed with status {status:?}")]
    ComputationFailed {
        /// Reported status
        status: String,
        /// Reported detail
        response: Option<String>,
    },

    /// Response body was not the expected JSON
    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse {
        /// Endpoint path
        endpoint: String,
        /// Parse failure and HTTP status
        reason: String,
    },

    /// JSON encoding failed
    #[error("Serialization error: {source}")]
    Serialization {
        /// Underlying serde_json error
        #[from]
        source: serde_json::Error,
    },
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether the same request might succeed if the user tries again
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClientError::Http { source } => source.is_timeout() || source.is_connect(),
            ClientError::UploadRejected { .. } => true,
            ClientError::InvalidResponse { .. } => true,
            ClientError::ComputationFailed { .. } => false,
            ClientError::InvalidUrl { .. } => false,
            ClientError::InvalidForm { .. } => false,
            ClientError::Serialization { .. } => false,
        }
    }
}
