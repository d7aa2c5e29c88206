//! Video4Linux2 camera input for Linux

use super::{CaptureSettings, PlatformCapture};
use crate::error::MediaError;

/// V4L2 camera exposed to ffmpeg as `-f v4l2`
#[derive(Debug, Default)]
pub struct V4L2Capture;

impl V4L2Capture {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformCapture for V4L2Capture {
    fn name(&self) -> &'static str {
        "v4l2"
    }

    fn default_device(&self) -> String {
        "/dev/video0".to_string()
    }

    fn get_devices(&self) -> Result<Vec<String>, MediaError> {
        let mut devices: Vec<String> = std::fs::read_dir("/dev")?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("video"))
            .map(|name| format!("/dev/{}", name))
            .collect();
        devices.sort();
        Ok(devices)
    }

    fn input_args(&self, device: &str, settings: &CaptureSettings) -> Vec<String> {
        vec![
            "-f".to_string(),
            "v4l2".to_string(),
            "-framerate".to_string(),
            settings.framerate.to_string(),
            "-video_size".to_string(),
            settings.resolution.to_ffmpeg(),
            "-i".to_string(),
            device.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::VideoResolution;

    #[test]
    fn test_v4l2_args() {
        let settings = CaptureSettings {
            resolution: VideoResolution::HD,
            framerate: 30,
        };
        let args = V4L2Capture::new().input_args("/dev/video2", &settings);
        assert_eq!(
            args,
            vec!["-f", "v4l2", "-framerate", "30", "-video_size", "1280x720", "-i", "/dev/video2"]
        );
    }
}
