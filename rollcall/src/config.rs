//! Configuration types and defaults
//!
//! [`GlobalConfig`] starts from [`Default`], is overlaid with `ROLLCALL_*`
//! environment variables by [`GlobalConfig::from_env`], and finally with
//! command line flags by the binary.

use rollcall_client::{ClientConfig, ProcessingMode};
use rollcall_media::{
    CaptureBackend, FfmpegTools, RecorderConfig, SamplerConfig, VideoResolution,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RollcallError, RollcallResult};

/// Prefix of every environment variable read by [`GlobalConfig::from_env`]
pub const ENV_PREFIX: &str = "ROLLCALL_";

/// Global rollcall configuration
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Attendance service root
    pub server_url: String,
    /// Number of evenly spaced frames to submit
    pub frame_count: usize,
    /// Processing mode requested from the service
    pub processing_mode: ProcessingMode,
    /// Upper bound for one seek-and-capture
    pub seek_timeout: Duration,
    /// JPEG quality of submitted stills
    pub still_quality: u8,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Multipart field name for the image array
    pub frames_field: String,
    /// Identification fields sent with every upload
    pub identification: Vec<(String, String)>,
    /// Camera recorder settings
    pub recorder: RecorderConfig,
    /// `ffmpeg` binary
    pub ffmpeg_path: PathBuf,
    /// `ffprobe` binary
    pub ffprobe_path: PathBuf,
    /// Enable debug logging
    pub debug_logging: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let client = ClientConfig::default();
        let sampler = SamplerConfig::default();
        let tools = FfmpegTools::default();
        Self {
            server_url: client.base_url,
            frame_count: sampler.frame_count,
            processing_mode: ProcessingMode::default(),
            seek_timeout: sampler.seek_timeout,
            still_quality: sampler.still_quality,
            request_timeout: client.request_timeout,
            frames_field: client.frames_field,
            identification: Vec::new(),
            recorder: RecorderConfig::default(),
            ffmpeg_path: tools.ffmpeg,
            ffprobe_path: tools.ffprobe,
            debug_logging: false,
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> RollcallResult<T> {
    value.trim().parse().map_err(|_| RollcallError::Configuration {
        message: format!("{}{} has an invalid value {:?}", ENV_PREFIX, key, value),
    })
}

fn parse_bool(key: &str, value: &str) -> RollcallResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RollcallError::Configuration {
            message: format!("{}{} must be a boolean, got {:?}", ENV_PREFIX, key, value),
        }),
    }
}

/// Parse a capture backend name
pub fn parse_backend(value: &str) -> Option<CaptureBackend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "platform" | "camera" => Some(CaptureBackend::Platform),
        "testsrc" | "test" | "pattern" => Some(CaptureBackend::TestPattern),
        _ => None,
    }
}

/// Parse `name=value,name=value` identification fields
pub fn parse_identification(value: &str) -> RollcallResult<Vec<(String, String)>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| RollcallError::Configuration {
                    message: format!("identification field {:?} is not name=value", pair),
                })
        })
        .collect()
}

impl GlobalConfig {
    /// Defaults overlaid with `ROLLCALL_*` environment variables
    pub fn from_env() -> RollcallResult<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        Ok(config)
    }

    /// Overlay values from `lookup`, keyed without the `ROLLCALL_` prefix
    pub fn apply_env<F>(&mut self, lookup: F) -> RollcallResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("FRAME_COUNT") {
            self.frame_count = parse("FRAME_COUNT", &v)?;
        }
        if let Some(v) = lookup("PROCESSING_MODE") {
            self.processing_mode = parse("PROCESSING_MODE", &v)?;
        }
        if let Some(v) = lookup("SEEK_TIMEOUT_MS") {
            self.seek_timeout = Duration::from_millis(parse("SEEK_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("STILL_QUALITY") {
            self.still_quality = parse("STILL_QUALITY", &v)?;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            self.request_timeout = Duration::from_secs(parse("REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("FRAMES_FIELD") {
            self.frames_field = v;
        }
        if let Some(v) = lookup("IDENTIFICATION") {
            self.identification = parse_identification(&v)?;
        }
        if let Some(v) = lookup("CAPTURE_BACKEND") {
            self.recorder.backend = parse_backend(&v).ok_or_else(|| RollcallError::Configuration {
                message: format!("{}CAPTURE_BACKEND has an invalid value {:?}", ENV_PREFIX, v),
            })?;
        }
        if let Some(v) = lookup("CAMERA_DEVICE") {
            self.recorder.device = Some(v);
        }
        if let Some(v) = lookup("RESOLUTION") {
            self.recorder.resolution = parse::<VideoResolution>("RESOLUTION", &v)?;
        }
        if let Some(v) = lookup("FRAMERATE") {
            self.recorder.framerate = parse("FRAMERATE", &v)?;
        }
        if let Some(v) = lookup("OUTPUT_DIR") {
            self.recorder.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FFMPEG") {
            self.ffmpeg_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("FFPROBE") {
            self.ffprobe_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("DEBUG") {
            self.debug_logging = parse_bool("DEBUG", &v)?;
        }
        Ok(())
    }

    /// Validate every derived configuration
    pub fn validate(&self) -> RollcallResult<()> {
        self.sampler_config().validate()?;
        self.recorder.validate()?;
        self.client_config().validate()?;
        Ok(())
    }

    /// Sampler settings
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            frame_count: self.frame_count,
            seek_timeout: self.seek_timeout,
            still_quality: self.still_quality,
        }
    }

    /// HTTP client settings
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server_url.clone(),
            request_timeout: self.request_timeout,
            frames_field: self.frames_field.clone(),
        }
    }

    /// External tool locations
    pub fn tools(&self) -> FfmpegTools {
        FfmpegTools {
            ffmpeg: self.ffmpeg_path.clone(),
            ffprobe: self.ffprobe_path.clone(),
        }
    }
}
