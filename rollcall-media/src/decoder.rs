//! Seekable decoding of recorded sessions
//!
//! The sampler only needs two things from a recording: its natural metadata
//! and "show me the frame at offset t". [`SeekableMedia`] is that seam;
//! [`FfmpegDecoder`] implements it by running `ffprobe` once and one short
//! `ffmpeg` invocation per seek.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};
use crate::recording::{MediaMetadata, Recording, RecordingSource};
use crate::surface::CaptureSurface;

/// A decoded recording that can be positioned and drawn from
#[async_trait]
pub trait SeekableMedia: Send {
    /// Discover natural pixel dimensions and duration
    async fn load_metadata(&mut self) -> MediaResult<MediaMetadata>;

    /// Seek to `offset` and draw the displayed frame into `surface`
    async fn seek_and_capture(
        &mut self,
        offset: Duration,
        surface: &mut CaptureSurface,
    ) -> MediaResult<()>;
}

/// Locations of the external ffmpeg tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegTools {
    /// `ffmpeg` binary
    pub ffmpeg: PathBuf,
    /// `ffprobe` binary
    pub ffprobe: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegTools {
    /// Check that both tools run
    pub async fn check(&self) -> MediaResult<()> {
        for tool in [&self.ffmpeg, &self.ffprobe] {
            let output = run_tool(Command::new(tool).arg("-version"), tool).await?;
            if !output.status.success() {
                return Err(MediaError::ToolNotAvailable {
                    tool: tool.display().to_string(),
                    reason: format!("exited with {}", output.status),
                });
            }
        }
        Ok(())
    }
}

pub(crate) async fn run_tool(command: &mut Command, tool: &Path) -> MediaResult<std::process::Output> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    command.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MediaError::ToolNotAvailable {
                tool: tool.display().to_string(),
                reason: "not found on PATH".to_string(),
            }
        } else {
            MediaError::Io { source: e }
        }
    })
}

/// Temp copy of an in-memory recording, removed on drop
#[derive(Debug)]
struct SpilledPayload {
    path: PathBuf,
}

impl Drop for SpilledPayload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("Failed to remove spilled recording {:?}: {}", self.path, e);
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_probe_duration(raw: Option<&str>) -> Option<Duration> {
    let secs: f64 = raw?.trim().parse().ok()?;
    if secs.is_finite() && secs > 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

/// Parse `ffprobe -of json` output into metadata
fn parse_probe(json: &[u8]) -> MediaResult<MediaMetadata> {
    let probe: ProbeOutput = serde_json::from_slice(json)?;
    let stream = probe
        .streams
        .iter()
        .find(|s| s.width.unwrap_or(0) > 0 && s.height.unwrap_or(0) > 0)
        .ok_or_else(|| MediaError::decoding("no video stream with pixel dimensions"))?;

    let duration = parse_probe_duration(stream.duration.as_deref()).or_else(|| {
        probe
            .format
            .as_ref()
            .and_then(|f| parse_probe_duration(f.duration.as_deref()))
    });

    Ok(MediaMetadata {
        width: stream.width.unwrap_or_default(),
        height: stream.height.unwrap_or_default(),
        duration,
    })
}

/// ffmpeg-backed [`SeekableMedia`]
#[derive(Debug)]
pub struct FfmpegDecoder {
    input: PathBuf,
    tools: FfmpegTools,
    metadata: Option<MediaMetadata>,
    _spill: Option<SpilledPayload>,
}

impl FfmpegDecoder {
    /// Open a recording; in-memory payloads are spilled to a temp file
    pub async fn open(recording: &Recording, tools: FfmpegTools) -> MediaResult<Self> {
        let (input, spill) = match &recording.source {
            RecordingSource::File(path) => {
                if tokio::fs::metadata(path).await.is_err() {
                    return Err(MediaError::decoding(format!(
                        "recording {} does not exist",
                        path.display()
                    )));
                }
                (path.clone(), None)
            }
            RecordingSource::Memory(data) => {
                if data.is_empty() {
                    return Err(MediaError::decoding("recording payload is empty"));
                }
                let path = std::env::temp_dir().join(format!(
                    "rollcall-{}.{}",
                    Uuid::new_v4(),
                    recording.container
                ));
                tokio::fs::write(&path, data).await?;
                debug!("Spilled {} byte recording to {:?}", data.len(), path);
                (path.clone(), Some(SpilledPayload { path }))
            }
        };

        Ok(Self {
            input,
            tools,
            metadata: None,
            _spill: spill,
        })
    }

    /// Path handed to ffmpeg
    pub fn input(&self) -> &Path {
        &self.input
    }
}

#[async_trait]
impl SeekableMedia for FfmpegDecoder {
    async fn load_metadata(&mut self) -> MediaResult<MediaMetadata> {
        if let Some(metadata) = self.metadata {
            return Ok(metadata);
        }

        let output = run_tool(
            Command::new(&self.tools.ffprobe)
                .args(["-v", "error", "-select_streams", "v:0"])
                .args(["-show_entries", "stream=width,height,duration:format=duration"])
                .args(["-of", "json"])
                .arg(&self.input),
            &self.tools.ffprobe,
        )
        .await?;

        if !output.status.success() {
            return Err(MediaError::decoding(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let metadata = parse_probe(&output.stdout)?;
        debug!(
            "Probed {:?}: {}x{}, duration {:?}",
            self.input, metadata.width, metadata.height, metadata.duration
        );
        self.metadata = Some(metadata);
        Ok(metadata)
    }

    async fn seek_and_capture(
        &mut self,
        offset: Duration,
        surface: &mut CaptureSurface,
    ) -> MediaResult<()> {
        let scale = format!("scale={}:{}", surface.width(), surface.height());
        let output = run_tool(
            Command::new(&self.tools.ffmpeg)
                .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
                .arg("-ss")
                .arg(format!("{:.3}", offset.as_secs_f64()))
                .arg("-i")
                .arg(&self.input)
                .args(["-frames:v", "1", "-vf", scale.as_str()])
                .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"]),
            &self.tools.ffmpeg,
        )
        .await?;

        if !output.status.success() {
            return Err(MediaError::SeekFailed {
                offset,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if output.stdout.is_empty() {
            return Err(MediaError::SeekFailed {
                offset,
                reason: "no frame at offset".to_string(),
            });
        }

        trace!("Captured {} bytes at {:?}", output.stdout.len(), offset);
        surface.draw(&output.stdout)
    }
}
