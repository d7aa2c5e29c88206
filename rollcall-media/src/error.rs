//! Media error types and handling
//!
//! This module defines the error types used throughout recording, decoding,
//! sampling and still encoding, with categories and a recoverability hint so
//! callers can decide whether to let the user retry.

use std::time::Duration;
use thiserror::Error;

/// Main error type for media operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// The recording window is empty or reversed
    #[error("Invalid session window: end {end} is not after start {start}")]
    InvalidSessionWindow {
        /// Session start, RFC 3339
        start: String,
        /// Session end, RFC 3339
        end: String,
    },

    /// Camera or recorder could not be started
    #[error("Acquisition failed on {device}: {reason}")]
    AcquisitionFailed {
        /// Capture device
        device: String,
        /// Failure reason
        reason: String,
    },

    /// Encoding operation failed
    #[error("Encoding failed: {codec} - {reason}")]
    EncodingFailed {
        /// Codec name
        codec: String,
        /// Failure reason
        reason: String,
    },

    /// The recording could not be decoded at all
    #[error("Decoding failed: {codec} - {reason}")]
    DecodingFailed {
        /// Codec or tool name
        codec: String,
        /// Failure reason
        reason: String,
    },

    /// A single seek did not yield a frame
    #[error("Seek to {offset:?} failed: {reason}")]
    SeekFailed {
        /// Requested media offset
        offset: Duration,
        /// Failure reason
        reason: String,
    },

    /// Every requested seek failed, nothing to pad from
    #[error("No frames captured out of {requested} requested")]
    NoFramesCaptured {
        /// Number of frames requested
        requested: usize,
    },

    /// Invalid frame data error
    #[error("Invalid frame data: expected {expected} bytes, got {actual}")]
    InvalidFrameData {
        /// Expected data size
        expected: usize,
        /// Actual data size
        actual: usize,
    },

    /// External tool missing or unusable
    #[error("Tool not available: {tool} - {reason}")]
    ToolNotAvailable {
        /// Tool name
        tool: String,
        /// Failure reason
        reason: String,
    },

    /// Timeout error
    #[error("Operation timed out after {duration:?}")]
    Timeout {
        /// Duration after which timeout occurred
        duration: Duration,
    },

    /// Invalid state for operation
    #[error("Invalid state: {message}")]
    InvalidState {
        /// State error message
        message: String,
    },

    /// Manifest or metadata could not be (de)serialized
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::Io { .. } => true,
            MediaError::Timeout { .. } => true,
            MediaError::AcquisitionFailed { .. } => true,
            MediaError::SeekFailed { .. } => true,
            MediaError::EncodingFailed { .. } => false,
            MediaError::DecodingFailed { .. } => false,
            MediaError::NoFramesCaptured { .. } => false,
            MediaError::ToolNotAvailable { .. } => false,
            _ => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::Io { .. } => ErrorCategory::System,
            MediaError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            MediaError::InvalidSessionWindow { .. } => ErrorCategory::Validation,
            MediaError::AcquisitionFailed { .. } => ErrorCategory::Device,
            MediaError::EncodingFailed { .. } => ErrorCategory::Codec,
            MediaError::DecodingFailed { .. } => ErrorCategory::Codec,
            MediaError::SeekFailed { .. } => ErrorCategory::Capture,
            MediaError::NoFramesCaptured { .. } => ErrorCategory::Capture,
            MediaError::InvalidFrameData { .. } => ErrorCategory::Data,
            MediaError::ToolNotAvailable { .. } => ErrorCategory::Platform,
            MediaError::Timeout { .. } => ErrorCategory::System,
            MediaError::InvalidState { .. } => ErrorCategory::State,
            MediaError::Serialization { .. } => ErrorCategory::Data,
        }
    }

    pub(crate) fn decoding(reason: impl Into<String>) -> Self {
        MediaError::DecodingFailed {
            codec: "ffmpeg".to_string(),
            reason: reason.into(),
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// System-level errors (I/O, timeouts)
    System,
    /// Configuration and parameter errors
    Configuration,
    /// Rejected requests (bad frame count, bad window)
    Validation,
    /// Codec-related errors
    Codec,
    /// Seek and capture errors during sampling
    Capture,
    /// Platform and external tool errors
    Platform,
    /// Data validation errors
    Data,
    /// Device and hardware errors
    Device,
    /// State management errors
    State,
}
