//! Capture surface shared by every seek of a sampling run

use image::RgbImage;

use crate::error::{MediaError, MediaResult};
use crate::recording::MediaMetadata;

/// In-memory RGB24 drawing target sized to the video's pixel dimensions.
///
/// One surface is reused for all captures of a run: each capture overwrites
/// it and is read back before the next seek is issued.
#[derive(Debug)]
pub struct CaptureSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    generation: u64,
}

impl CaptureSurface {
    /// Bytes per RGB24 pixel
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Allocate a black surface
    pub fn new(width: u32, height: u32) -> MediaResult<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: format!("Capture surface must be non-empty, got {}x{}", width, height),
            });
        }

        Ok(Self {
            width,
            height,
            pixels: vec![0; Self::frame_len(width, height)],
            generation: 0,
        })
    }

    /// Surface matching the natural size of a recording
    pub fn for_metadata(metadata: &MediaMetadata) -> MediaResult<Self> {
        Self::new(metadata.width, metadata.height)
    }

    /// Byte length of one RGB24 frame
    pub fn frame_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::BYTES_PER_PIXEL
    }

    /// Surface width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Surface height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of completed draws
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Overwrite the surface with one packed RGB24 frame
    pub fn draw(&mut self, rgb: &[u8]) -> MediaResult<()> {
        if rgb.len() != self.pixels.len() {
            return Err(MediaError::InvalidFrameData {
                expected: self.pixels.len(),
                actual: rgb.len(),
            });
        }
        self.pixels.copy_from_slice(rgb);
        self.generation += 1;
        Ok(())
    }

    /// Raw pixel bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy of the current content as an image
    pub fn snapshot(&self) -> MediaResult<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.pixels.clone()).ok_or(
            MediaError::InvalidFrameData {
                expected: Self::frame_len(self.width, self.height),
                actual: self.pixels.len(),
            },
        )
    }
}
