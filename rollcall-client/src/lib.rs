//! # Rollcall Client
//!
//! HTTP client for the attendance service. Uploads sampled frames with their
//! wall-clock labels, triggers the attendance computation and reports where
//! the results can be viewed.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod protocol;

// Re-export main types
pub use client::{AttendanceClient, AttendanceService, ClientConfig};
pub use error::{ClientError, ClientResult};
pub use protocol::{
    CalcOutcome, CalcResponse, HealthResponse, ProcessingMode, UploadForm, UploadResponse,
};
