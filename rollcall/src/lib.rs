//! # Rollcall - Camera Attendance Capture
//!
//! Rollcall records a short camera session, samples a fixed number of evenly
//! spaced frames from it, labels every frame with its wall-clock time in IST
//! and submits the frames to an attendance service for face recognition.
//!
//! ## Key Features
//!
//! - **Even sampling**: frame `i` is taken at `i * (end - start) / n`
//! - **Exact frame count**: failed seeks are padded with the last good capture
//! - **Platform cameras**: v4l2, AVFoundation and DirectShow through ffmpeg
//! - **Session events**: progress is streamed to UI collaborators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rollcall::{AttendanceSession, GlobalConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = AttendanceSession::builder(GlobalConfig::from_env()?).build()?;
//!
//!     let mut events = session.events();
//!     tokio::spawn(async move {
//!         while let Some(event) = events.next().await {
//!             println!("Session event: {:?}", event);
//!         }
//!     });
//!
//!     let outcome = session.run_to_completion(Duration::from_secs(10)).await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export member crate types for easy access
pub use rollcall_client::{
    AttendanceClient, AttendanceService, CalcOutcome, ClientConfig, ClientError, ProcessingMode,
    UploadForm,
};
pub use rollcall_media::{
    FrameSample, FrameSampler, MediaError, PartialCapture, Recorder, Recording, RecordingSession,
    SampleSet, SamplerConfig, SeekableMedia,
};

// Public API modules
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod session;

// Re-export main API types
pub use config::GlobalConfig;
pub use error::{RollcallError, RollcallResult};
pub use event::{EventStream, SessionEvent, SessionStage};
pub use logging::init_logging;
pub use session::{AttendanceSession, SessionBuilder, SessionState};
