//! Attendance session lifecycle
//!
//! A session records one camera clip, samples it into a fixed number of
//! labelled stills and submits them. It holds the samples itself and allows
//! only one recording at a time:
//!
//! ```text
//! Idle -> Recording -> Sampling -> Ready -> Uploading -> Computing -> Completed
//!                                    \________________________________/
//!                                         any failure -> Failed
//! ```
//!
//! `reset()` returns to `Idle` from any state and releases the camera.

use rollcall_client::{
    AttendanceClient, AttendanceService, CalcOutcome, ProcessingMode, UploadForm,
};
use rollcall_media::{
    FfmpegDecoder, FfmpegRecorder, FfmpegTools, FrameSampler, Recorder, RecordingSession,
    SampleSet, SamplerConfig, SeekableMedia,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GlobalConfig;
use crate::error::{RollcallError, RollcallResult};
use crate::event::{EventSink, EventStream, SessionEvent, SessionStage};

/// Where a session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing recorded
    Idle,
    /// Camera is recording
    Recording,
    /// Frames are being sampled
    Sampling,
    /// Samples are held and can be submitted
    Ready,
    /// Upload in flight
    Uploading,
    /// Waiting for the attendance computation
    Computing,
    /// Results are available
    Completed,
    /// A step failed; see the last `Failed` event
    Failed,
}

/// Fluent builder for an [`AttendanceSession`]
pub struct SessionBuilder {
    config: GlobalConfig,
    recorder: Option<Box<dyn Recorder>>,
    service: Option<Arc<dyn AttendanceService>>,
}

impl SessionBuilder {
    /// Start from a configuration
    pub fn new(config: GlobalConfig) -> Self {
        Self {
            config,
            recorder: None,
            service: None,
        }
    }

    /// Use a custom recorder instead of ffmpeg
    pub fn recorder(mut self, recorder: Box<dyn Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Use a custom service instead of the HTTP client
    pub fn service(mut self, service: Arc<dyn AttendanceService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Validate the configuration and build the session
    pub fn build(self) -> RollcallResult<AttendanceSession> {
        self.config.validate()?;
        let tools = self.config.tools();

        let recorder: Box<dyn Recorder> = match self.recorder {
            Some(recorder) => recorder,
            None => Box::new(FfmpegRecorder::new(
                self.config.recorder.clone(),
                tools.clone(),
            )?),
        };
        let service: Arc<dyn AttendanceService> = match self.service {
            Some(service) => service,
            None => Arc::new(AttendanceClient::new(self.config.client_config())?),
        };

        Ok(AttendanceSession {
            id: Uuid::new_v4(),
            sampler_config: self.config.sampler_config(),
            processing_mode: self.config.processing_mode,
            identification: self.config.identification,
            tools,
            recorder,
            service,
            state: SessionState::Idle,
            samples: None,
            outcome: None,
            events: EventSink::default(),
        })
    }
}

/// One record, sample and submit cycle
pub struct AttendanceSession {
    id: Uuid,
    sampler_config: SamplerConfig,
    processing_mode: ProcessingMode,
    identification: Vec<(String, String)>,
    tools: FfmpegTools,
    recorder: Box<dyn Recorder>,
    service: Arc<dyn AttendanceService>,
    state: SessionState,
    samples: Option<SampleSet>,
    outcome: Option<CalcOutcome>,
    events: EventSink,
}

impl std::fmt::Debug for AttendanceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttendanceSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("samples", &self.samples.as_ref().map(SampleSet::len))
            .finish()
    }
}

impl AttendanceSession {
    /// Builder with the given configuration
    pub fn builder(config: GlobalConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    /// Session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Samples held for submission
    pub fn samples(&self) -> Option<&SampleSet> {
        self.samples.as_ref()
    }

    /// Outcome of the last successful submission
    pub fn outcome(&self) -> Option<&CalcOutcome> {
        self.outcome.as_ref()
    }

    /// Subscribe to events; replaces any previous subscriber
    pub fn events(&mut self) -> EventStream {
        self.events.subscribe()
    }

    fn expect_state(&self, allowed: &[SessionState], operation: &str) -> RollcallResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(RollcallError::invalid_state(format!(
                "cannot {} while {:?}",
                operation, self.state
            )))
        }
    }

    fn fail(&mut self, stage: SessionStage, error: RollcallError) -> RollcallError {
        warn!("Session {} failed during {}: {}", self.id, stage.as_str(), error);
        self.state = SessionState::Failed;
        self.events.emit(SessionEvent::Failed {
            stage,
            error: error.to_string(),
            recoverable: error.is_recoverable(),
        });
        error
    }

    /// Acquire the camera and start recording
    pub async fn start_recording(&mut self) -> RollcallResult<()> {
        self.expect_state(&[SessionState::Idle], "start recording")?;

        if let Err(e) = self.recorder.start_recording().await {
            return Err(self.fail(SessionStage::Recording, e.into()));
        }

        self.state = SessionState::Recording;
        info!("Session {} recording", self.id);
        self.events
            .emit(SessionEvent::RecordingStarted { session_id: self.id });
        Ok(())
    }

    async fn stop_recording(&mut self) -> RollcallResult<RecordingSession> {
        self.expect_state(&[SessionState::Recording], "stop recording")?;

        let recording = match self.recorder.stop_recording().await {
            Ok(recording) => recording,
            Err(e) => return Err(self.fail(SessionStage::Recording, e.into())),
        };

        self.events.emit(SessionEvent::RecordingStopped {
            output: recording.recording().path().map(|p| p.to_path_buf()),
            duration: recording.duration(),
        });
        Ok(recording)
    }

    /// Stop recording and sample the clip with the ffmpeg decoder
    pub async fn stop_and_sample(&mut self) -> RollcallResult<&SampleSet> {
        let recording = self.stop_recording().await?;
        self.state = SessionState::Sampling;
        self.decode_into_session(recording).await
    }

    /// Stop recording and sample through `media`
    pub async fn stop_and_sample_with(
        &mut self,
        media: &mut dyn SeekableMedia,
    ) -> RollcallResult<&SampleSet> {
        let recording = self.stop_recording().await?;
        self.state = SessionState::Sampling;
        self.sample_into_session(recording, media).await
    }

    /// Sample an existing recording with the ffmpeg decoder
    pub async fn sample_recording(
        &mut self,
        recording: RecordingSession,
    ) -> RollcallResult<&SampleSet> {
        self.expect_state(&[SessionState::Idle], "sample a recording")?;
        self.state = SessionState::Sampling;
        self.decode_into_session(recording).await
    }

    async fn decode_into_session(
        &mut self,
        recording: RecordingSession,
    ) -> RollcallResult<&SampleSet> {
        let mut decoder = match FfmpegDecoder::open(recording.recording(), self.tools.clone()).await
        {
            Ok(decoder) => decoder,
            Err(e) => return Err(self.fail(SessionStage::Sampling, e.into())),
        };
        self.sample_into_session(recording, &mut decoder).await
    }

    /// Sample an existing recording through `media`
    pub async fn sample_recording_with(
        &mut self,
        recording: RecordingSession,
        media: &mut dyn SeekableMedia,
    ) -> RollcallResult<&SampleSet> {
        self.expect_state(&[SessionState::Idle], "sample a recording")?;
        self.state = SessionState::Sampling;
        self.sample_into_session(recording, media).await
    }

    async fn sample_into_session(
        &mut self,
        recording: RecordingSession,
        media: &mut dyn SeekableMedia,
    ) -> RollcallResult<&SampleSet> {
        let sampler = match FrameSampler::new(self.sampler_config.clone()) {
            Ok(sampler) => sampler,
            Err(e) => return Err(self.fail(SessionStage::Sampling, e.into())),
        };

        let set = match sampler.sample(recording, media).await {
            Ok(set) => set,
            Err(e) => return Err(self.fail(SessionStage::Sampling, e.into())),
        };

        self.events.emit(SessionEvent::SamplingFinished {
            frames: set.len(),
            captured: set.captured(),
            padded: set.is_partial(),
        });
        self.state = SessionState::Ready;
        Ok(&*self.samples.insert(set))
    }

    fn upload_form(&self, set: &SampleSet) -> UploadForm {
        let mut form = UploadForm::new(set.image_urls(), set.labels(), self.processing_mode);
        form.fields = self.identification.clone();
        form
    }

    /// Upload the held samples and compute attendance.
    ///
    /// Allowed from `Ready`, and from `Failed` while samples are still held
    /// so that a rejected upload can be retried.
    pub async fn submit(&mut self) -> RollcallResult<CalcOutcome> {
        let form = match (&self.state, &self.samples) {
            (SessionState::Ready | SessionState::Failed, Some(set)) => self.upload_form(set),
            _ => {
                return Err(RollcallError::invalid_state(format!(
                    "cannot submit while {:?} without samples",
                    self.state
                )))
            }
        };

        self.state = SessionState::Uploading;
        let uploaded = match self.service.upload(&form).await {
            Ok(uploaded) => uploaded,
            Err(e) => return Err(self.fail(SessionStage::Upload, e.into())),
        };
        self.events.emit(SessionEvent::Uploaded {
            time: uploaded.time,
        });

        self.state = SessionState::Computing;
        let outcome = match self.service.calc_attendance().await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(SessionStage::Computation, e.into())),
        };

        let CalcOutcome::Completed { results_url, .. } = &outcome;
        info!("Session {} completed, results at {}", self.id, results_url);
        self.events.emit(SessionEvent::Completed {
            results_url: results_url.clone(),
        });
        self.state = SessionState::Completed;
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Record for `length`, sample, and submit
    pub async fn run_to_completion(&mut self, length: Duration) -> RollcallResult<CalcOutcome> {
        self.start_recording().await?;
        tokio::time::sleep(length).await;
        self.stop_and_sample().await?;
        self.submit().await
    }

    /// Drop samples and results, stop any running recording, return to `Idle`
    pub async fn reset(&mut self) {
        if self.recorder.is_recording() {
            if let Err(e) = self.recorder.stop_recording().await {
                warn!("Recording stopped with error during reset: {}", e);
            }
        }
        self.samples = None;
        self.outcome = None;
        self.state = SessionState::Idle;
        self.id = Uuid::new_v4();
    }
}
