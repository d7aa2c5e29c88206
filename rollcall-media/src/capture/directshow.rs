//! DirectShow camera input for Windows

use super::{CaptureSettings, PlatformCapture};
use crate::error::MediaError;

/// DirectShow camera exposed to ffmpeg as `-f dshow`
#[derive(Debug, Default)]
pub struct DirectShowCapture;

impl DirectShowCapture {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformCapture for DirectShowCapture {
    fn name(&self) -> &'static str {
        "dshow"
    }

    fn default_device(&self) -> String {
        "Integrated Camera".to_string()
    }

    fn get_devices(&self) -> Result<Vec<String>, MediaError> {
        Ok(vec![self.default_device()])
    }

    fn input_args(&self, device: &str, settings: &CaptureSettings) -> Vec<String> {
        vec![
            "-f".to_string(),
            "dshow".to_string(),
            "-framerate".to_string(),
            settings.framerate.to_string(),
            "-video_size".to_string(),
            settings.resolution.to_ffmpeg(),
            "-i".to_string(),
            format!("video={}", device),
        ]
    }
}
