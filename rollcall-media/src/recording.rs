//! Recording payloads and the per-session record that owns them

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Where the recorded video lives
#[derive(Debug, Clone)]
pub enum RecordingSource {
    /// Video file on disk
    File(PathBuf),
    /// Whole payload held in memory
    Memory(Bytes),
}

/// Opaque recorded video payload for one session
#[derive(Debug, Clone)]
pub struct Recording {
    /// Payload location
    pub source: RecordingSource,
    /// Container hint, e.g. `webm`
    pub container: String,
}

impl Recording {
    /// Recording backed by a file; the container is taken from the extension
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let container = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("webm")
            .to_ascii_lowercase();
        Self {
            source: RecordingSource::File(path),
            container,
        }
    }

    /// Recording held in memory
    pub fn from_bytes(data: impl Into<Bytes>, container: &str) -> Self {
        Self {
            source: RecordingSource::Memory(data.into()),
            container: container.to_string(),
        }
    }

    /// Path of the payload when it is file backed
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            RecordingSource::File(path) => Some(path),
            RecordingSource::Memory(_) => None,
        }
    }

    /// Payload size in bytes, if cheaply known
    pub fn len(&self) -> Option<u64> {
        match &self.source {
            RecordingSource::File(path) => std::fs::metadata(path).ok().map(|m| m.len()),
            RecordingSource::Memory(data) => Some(data.len() as u64),
        }
    }

    /// Whether the payload is known to be empty
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

/// Metadata the decoder discovers from the payload itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaMetadata {
    /// Natural width in pixels
    pub width: u32,
    /// Natural height in pixels
    pub height: u32,
    /// Natural playable duration, absent for live-recorded WebM
    pub duration: Option<Duration>,
}

/// One recording plus the wall-clock marks of the real session.
///
/// The marks come from the caller, not from the payload: the decoded media
/// duration can drift from the wall-clock duration by the encoder latency.
/// A session is consumed by value when sampled.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    id: Uuid,
    recording: Recording,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl RecordingSession {
    /// Create a session, rejecting empty or reversed windows
    pub fn new(recording: Recording, start: DateTime<Utc>, end: DateTime<Utc>) -> MediaResult<Self> {
        if end <= start {
            return Err(MediaError::InvalidSessionWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            recording,
            start,
            end,
        })
    }

    /// Session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Recorded payload
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Wall-clock start
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Wall-clock end
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Real session duration from the wall-clock marks
    pub fn duration(&self) -> Duration {
        (self.end - self.start).to_std().unwrap_or_default()
    }
}
