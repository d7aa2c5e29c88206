//! Event system for attendance session progress

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Step of a session that an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    /// Camera acquisition or recording
    Recording,
    /// Decoding and frame sampling
    Sampling,
    /// `/upload_video`
    Upload,
    /// `/calc_attendance`
    Computation,
}

impl SessionStage {
    /// Stage name for logs and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStage::Recording => "recording",
            SessionStage::Sampling => "sampling",
            SessionStage::Upload => "upload",
            SessionStage::Computation => "computation",
        }
    }
}

/// Events emitted while a session moves through its states
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The camera is recording
    RecordingStarted {
        /// Session ID
        session_id: Uuid,
    },
    /// The camera was released and the recording is complete
    RecordingStopped {
        /// Recorded file, if the recording lives on disk
        output: Option<PathBuf>,
        /// Wall-clock length of the recording
        duration: Duration,
    },
    /// Frames were sampled and are ready to submit
    SamplingFinished {
        /// Frames in the set
        frames: usize,
        /// Genuine captures
        captured: usize,
        /// Whether the set was padded
        padded: bool,
    },
    /// The service accepted the upload
    Uploaded {
        /// Server-side processing time, if reported
        time: Option<String>,
    },
    /// Attendance was computed
    Completed {
        /// Results page
        results_url: String,
    },
    /// A step failed
    Failed {
        /// Failing step
        stage: SessionStage,
        /// Error message
        error: String,
        /// Whether the user can retry
        recoverable: bool,
    },
}

impl SessionEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::RecordingStarted { .. } => "recording_started",
            SessionEvent::RecordingStopped { .. } => "recording_stopped",
            SessionEvent::SamplingFinished { .. } => "sampling_finished",
            SessionEvent::Uploaded { .. } => "uploaded",
            SessionEvent::Completed { .. } => "completed",
            SessionEvent::Failed { .. } => "failed",
        }
    }

    /// Check if this is an error event
    pub fn is_error_event(&self) -> bool {
        matches!(self, SessionEvent::Failed { .. })
    }
}

/// Stream of session events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<SessionEvent>,
}

impl EventStream {
    /// Create a new event stream with a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<SessionEvent>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Close the event stream
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

/// Sending half held by a session; events are dropped while nobody listens
#[derive(Debug, Default)]
pub(crate) struct EventSink {
    sender: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl EventSink {
    /// Replace the current listener with a fresh stream
    pub(crate) fn subscribe(&mut self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sender = Some(tx);
        EventStream::new(rx)
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        debug!("Session event: {}", event.event_type());
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
