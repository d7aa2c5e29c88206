//! AVFoundation camera input for macOS

use super::{CaptureSettings, PlatformCapture};
use crate::error::MediaError;

/// AVFoundation camera exposed to ffmpeg as `-f avfoundation`.
///
/// Devices are addressed as `<video>:<audio>`; audio is always `none`.
#[derive(Debug, Default)]
pub struct AVFoundationCapture;

impl AVFoundationCapture {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformCapture for AVFoundationCapture {
    fn name(&self) -> &'static str {
        "avfoundation"
    }

    fn default_device(&self) -> String {
        "0".to_string()
    }

    fn get_devices(&self) -> Result<Vec<String>, MediaError> {
        // ffmpeg only lists devices on stderr; the default index is the built-in camera
        Ok(vec![self.default_device()])
    }

    fn input_args(&self, device: &str, settings: &CaptureSettings) -> Vec<String> {
        let device = if device.contains(':') {
            device.to_string()
        } else {
            format!("{}:none", device)
        };
        vec![
            "-f".to_string(),
            "avfoundation".to_string(),
            "-framerate".to_string(),
            settings.framerate.to_string(),
            "-video_size".to_string(),
            settings.resolution.to_ffmpeg(),
            "-i".to_string(),
            device,
        ]
    }
}
