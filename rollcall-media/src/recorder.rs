//! Camera recording
//!
//! A [`Recorder`] turns "start" and "stop" into a [`RecordingSession`]: the
//! recorded payload plus the wall-clock marks taken around the two calls.
//! [`FfmpegRecorder`] drives an `ffmpeg` child that reads the platform camera
//! and writes WebM; the camera is released as soon as the child exits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capture::{self, CaptureSettings, PlatformCapture, VideoResolution};
use crate::decoder::{run_tool, FfmpegTools};
use crate::error::{MediaError, MediaResult};
use crate::recording::{Recording, RecordingSession};

/// Video codec used for the recording, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingCodec {
    /// VP9 via libvpx
    Vp9,
    /// VP8 via libvpx
    Vp8,
    /// Whatever ffmpeg picks for WebM
    ContainerDefault,
}

impl RecordingCodec {
    /// Preferred order
    pub const FALLBACK_CHAIN: [RecordingCodec; 3] = [
        RecordingCodec::Vp9,
        RecordingCodec::Vp8,
        RecordingCodec::ContainerDefault,
    ];

    /// ffmpeg encoder name, if one must be requested explicitly
    pub fn encoder_name(&self) -> Option<&'static str> {
        match self {
            RecordingCodec::Vp9 => Some("libvpx-vp9"),
            RecordingCodec::Vp8 => Some("libvpx"),
            RecordingCodec::ContainerDefault => None,
        }
    }

    /// First codec of the chain that appears in `ffmpeg -encoders` output
    pub fn select(encoders_listing: &str) -> Self {
        let available: Vec<&str> = encoders_listing
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .collect();

        Self::FALLBACK_CHAIN
            .into_iter()
            .find(|codec| match codec.encoder_name() {
                Some(name) => available.contains(&name),
                None => true,
            })
            .unwrap_or(RecordingCodec::ContainerDefault)
    }

    fn output_args(&self) -> Vec<String> {
        match self.encoder_name() {
            Some(name) => vec![
                "-c:v".to_string(),
                name.to_string(),
                "-deadline".to_string(),
                "realtime".to_string(),
                "-cpu-used".to_string(),
                "8".to_string(),
            ],
            None => Vec::new(),
        }
    }
}

/// Which camera input to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureBackend {
    /// The platform camera (v4l2, avfoundation, dshow)
    Platform,
    /// ffmpeg's synthetic test pattern
    TestPattern,
}

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub backend: CaptureBackend,
    /// Capture device, platform default when `None`
    pub device: Option<String>,
    pub resolution: VideoResolution,
    pub framerate: u32,
    /// Directory recordings are written to
    pub output_dir: PathBuf,
    /// How long the child may take to finalize after `q`
    pub stop_timeout: Duration,
    /// How long a fresh child must survive to count as started
    pub startup_grace: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            backend: CaptureBackend::Platform,
            device: None,
            resolution: VideoResolution::HD,
            framerate: 30,
            output_dir: std::env::temp_dir().join("rollcall"),
            stop_timeout: Duration::from_secs(10),
            startup_grace: Duration::from_millis(500),
        }
    }
}

impl RecorderConfig {
    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Invalid resolution".to_string(),
            });
        }

        if self.framerate == 0 || self.framerate > 120 {
            return Err(MediaError::InvalidConfiguration {
                message: "Invalid framerate".to_string(),
            });
        }

        if self.stop_timeout.is_zero() {
            return Err(MediaError::InvalidConfiguration {
                message: "Stop timeout must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Recorder events
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    Started { device: String, output: PathBuf },
    Stopped { output: PathBuf, duration: Duration },
    Failed { device: String, error: String },
}

/// Starts and stops recordings
#[async_trait]
pub trait Recorder: Send {
    /// Acquire the camera and start recording
    async fn start_recording(&mut self) -> MediaResult<()>;

    /// Stop recording, release the camera and hand over the session
    async fn stop_recording(&mut self) -> MediaResult<RecordingSession>;

    /// Whether a recording is running
    fn is_recording(&self) -> bool;
}

struct ActiveRecording {
    child: Child,
    output: PathBuf,
    started_at: DateTime<Utc>,
}

/// ffmpeg-backed [`Recorder`]
pub struct FfmpegRecorder {
    config: RecorderConfig,
    tools: FfmpegTools,
    capture: Box<dyn PlatformCapture>,
    active: Option<ActiveRecording>,
    event_tx: broadcast::Sender<RecorderEvent>,
}

impl std::fmt::Debug for FfmpegRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegRecorder")
            .field("config", &self.config)
            .field("capture", &self.capture)
            .field("recording", &self.active.is_some())
            .finish()
    }
}

impl FfmpegRecorder {
    /// Create a recorder for the configured backend
    pub fn new(config: RecorderConfig, tools: FfmpegTools) -> MediaResult<Self> {
        config.validate()?;
        let capture: Box<dyn PlatformCapture> = match config.backend {
            CaptureBackend::Platform => capture::get_platform_capture(),
            CaptureBackend::TestPattern => Box::new(capture::TestPatternCapture::new()),
        };
        let (event_tx, _) = broadcast::channel(16);

        Ok(Self {
            config,
            tools,
            capture,
            active: None,
            event_tx,
        })
    }

    /// Subscribe to recorder events
    pub fn subscribe_events(&self) -> broadcast::Receiver<RecorderEvent> {
        self.event_tx.subscribe()
    }

    /// Get current configuration
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    fn device(&self) -> String {
        self.config
            .device
            .clone()
            .unwrap_or_else(|| self.capture.default_device())
    }

    async fn select_codec(&self) -> RecordingCodec {
        let listing = run_tool(
            Command::new(&self.tools.ffmpeg).args(["-hide_banner", "-encoders"]),
            &self.tools.ffmpeg,
        )
        .await;

        match listing {
            Ok(output) if output.status.success() => {
                RecordingCodec::select(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                warn!("ffmpeg -encoders exited with {}", output.status);
                RecordingCodec::ContainerDefault
            }
            Err(e) => {
                warn!("Could not list ffmpeg encoders: {}", e);
                RecordingCodec::ContainerDefault
            }
        }
    }

    fn acquisition_failed(&self, device: &str, reason: String) -> MediaError {
        error!("Failed to start recording on {}: {}", device, reason);
        let _ = self.event_tx.send(RecorderEvent::Failed {
            device: device.to_string(),
            error: reason.clone(),
        });
        MediaError::AcquisitionFailed {
            device: device.to_string(),
            reason,
        }
    }
}

async fn read_stderr(child: &mut Child) -> String {
    let mut text = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut text).await;
    }
    text.trim().to_string()
}

/// Log the child's stderr until it closes so the pipe never fills
fn drain_stderr(child: &mut Child) -> Option<tokio::task::JoinHandle<usize>> {
    let stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut count = 0;
        while let Ok(Some(line)) = lines.next_line().await {
            count += 1;
            warn!("ffmpeg: {}", line);
        }
        count
    }))
}

#[async_trait]
impl Recorder for FfmpegRecorder {
    async fn start_recording(&mut self) -> MediaResult<()> {
        if self.active.is_some() {
            return Err(MediaError::InvalidState {
                message: "Recording already in progress".to_string(),
            });
        }

        let device = self.device();
        let settings = CaptureSettings {
            resolution: self.config.resolution,
            framerate: self.config.framerate,
        };

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let output = self
            .config
            .output_dir
            .join(format!("session-{}.webm", Uuid::new_v4()));
        let codec = self.select_codec().await;
        debug!("Recording {} via {} with {:?}", device, self.capture.name(), codec);

        let mut command = Command::new(&self.tools.ffmpeg);
        command
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(self.capture.input_args(&device, &settings))
            .args(codec.output_args())
            .args(["-an", "-f", "webm"])
            .arg(&output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started_at = Utc::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return Err(self.acquisition_failed(&device, e.to_string())),
        };

        tokio::time::sleep(self.config.startup_grace).await;
        match child.try_wait() {
            Ok(None) => {}
            Ok(Some(status)) => {
                let stderr = read_stderr(&mut child).await;
                return Err(self.acquisition_failed(
                    &device,
                    format!("ffmpeg exited with {}: {}", status, stderr),
                ));
            }
            Err(e) => return Err(self.acquisition_failed(&device, e.to_string())),
        }

        drain_stderr(&mut child);
        info!("Recording started on {} -> {:?}", device, output);
        let _ = self.event_tx.send(RecorderEvent::Started {
            device,
            output: output.clone(),
        });
        self.active = Some(ActiveRecording {
            child,
            output,
            started_at,
        });
        Ok(())
    }

    async fn stop_recording(&mut self) -> MediaResult<RecordingSession> {
        let mut active = self.active.take().ok_or_else(|| MediaError::InvalidState {
            message: "Not recording".to_string(),
        })?;
        let ended_at = Utc::now();

        if let Some(mut stdin) = active.child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                debug!("Could not send quit to ffmpeg: {}", e);
            }
        }

        match tokio::time::timeout(self.config.stop_timeout, active.child.wait()).await {
            Ok(Ok(status)) if !status.success() => {
                warn!("Recorder exited with {}", status);
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Waiting for recorder failed: {}", e),
            Err(_) => {
                warn!(
                    "Recorder did not finish within {:?}, killing it",
                    self.config.stop_timeout
                );
                active.child.kill().await?;
            }
        }

        let size = tokio::fs::metadata(&active.output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if size == 0 {
            return Err(MediaError::DecodingFailed {
                codec: "webm".to_string(),
                reason: format!("recording {:?} is empty", active.output),
            });
        }

        let session = RecordingSession::new(
            Recording::from_file(active.output.clone()),
            active.started_at,
            ended_at,
        )?;
        info!(
            "Recording stopped after {:?} ({} bytes), camera released",
            session.duration(),
            size
        );
        let _ = self.event_tx.send(RecorderEvent::Stopped {
            output: active.output,
            duration: session.duration(),
        });
        Ok(session)
    }

    fn is_recording(&self) -> bool {
        self.active.is_some()
    }
}
