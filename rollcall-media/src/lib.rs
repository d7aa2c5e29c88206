//! # Rollcall Media
//!
//! Camera recording, seekable decoding and evenly spaced frame sampling for
//! attendance sessions. This crate handles everything between the camera and
//! the labelled still images that are submitted for attendance computation.

#![warn(clippy::all)]

pub mod capture;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod export;
pub mod recorder;
pub mod recording;
pub mod sampler;
pub mod surface;
pub mod timestamp;

// Re-export main types
pub use capture::{CaptureSettings, PlatformCapture, VideoResolution};
pub use decoder::{FfmpegDecoder, FfmpegTools, SeekableMedia};
pub use encoder::{EncodedStill, JpegEncoder, StillEncoder};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use export::{export_samples, load_exported, ExportedFrames, FrameManifest};
pub use recorder::{
    CaptureBackend, FfmpegRecorder, Recorder, RecorderConfig, RecorderEvent, RecordingCodec,
};
pub use recording::{MediaMetadata, Recording, RecordingSession, RecordingSource};
pub use sampler::{
    sample_recording, FrameSample, FrameSampler, PartialCapture, SampleSet, SamplerConfig,
    SamplerState,
};
pub use surface::CaptureSurface;
pub use timestamp::{format_label, frame_instant, frame_label, offset_for, FileStemNamer};
