//! Platform camera inputs for the recorder
//!
//! Each platform exposes its camera to ffmpeg through a different input
//! device (`v4l2`, `avfoundation`, `dshow`). A [`PlatformCapture`] turns a
//! device name and capture settings into the matching ffmpeg input arguments.

pub mod avfoundation;
pub mod directshow;
pub mod v4l2;

use crate::error::MediaError;

/// Video resolution information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
}

impl VideoResolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const HD: Self = Self::new(1280, 720);
    pub const VGA: Self = Self::new(640, 480);

    /// `WxH` as ffmpeg expects it
    pub fn to_ffmpeg(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for VideoResolution {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MediaError::InvalidConfiguration {
            message: format!("Resolution must look like 1280x720, got {:?}", s),
        };
        let (w, h) = s.split_once(|c: char| c == 'x' || c == 'X').ok_or_else(invalid)?;
        let width = w.trim().parse().map_err(|_| invalid())?;
        let height = h.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(width, height))
    }
}

/// Camera settings handed to the input device
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub resolution: VideoResolution,
    pub framerate: u32,
}

/// Platform-specific camera input
pub trait PlatformCapture: Send + Sync + std::fmt::Debug {
    /// Backend name for logs
    fn name(&self) -> &'static str;
    /// Device used when none is configured
    fn default_device(&self) -> String;
    /// Devices that look usable
    fn get_devices(&self) -> Result<Vec<String>, MediaError>;
    /// ffmpeg input arguments, ending with `-i <device>`
    fn input_args(&self, device: &str, settings: &CaptureSettings) -> Vec<String>;
}

/// Get the appropriate platform capture backend
pub fn get_platform_capture() -> Box<dyn PlatformCapture> {
    #[cfg(target_os = "macos")]
    {
        Box::new(avfoundation::AVFoundationCapture::new())
    }
    #[cfg(target_os = "linux")]
    {
        Box::new(v4l2::V4L2Capture::new())
    }
    #[cfg(target_os = "windows")]
    {
        Box::new(directshow::DirectShowCapture::new())
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Box::new(TestPatternCapture::new())
    }
}

/// Synthetic camera built from ffmpeg's `testsrc`, for tests and headless machines
#[derive(Debug, Default)]
pub struct TestPatternCapture;

impl TestPatternCapture {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformCapture for TestPatternCapture {
    fn name(&self) -> &'static str {
        "testsrc"
    }

    fn default_device(&self) -> String {
        "testsrc".to_string()
    }

    fn get_devices(&self) -> Result<Vec<String>, MediaError> {
        Ok(vec![self.default_device()])
    }

    fn input_args(&self, device: &str, settings: &CaptureSettings) -> Vec<String> {
        vec![
            "-re".to_string(),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!(
                "{}=size={}:rate={}",
                device,
                settings.resolution.to_ffmpeg(),
                settings.framerate
            ),
        ]
    }
}
