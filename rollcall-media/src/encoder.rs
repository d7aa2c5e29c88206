//! Still image encoding for captured frames
//!
//! Captured surfaces are encoded as lossy stills and shipped as data URLs,
//! the form the attendance service splits on `,` before base64-decoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::RgbImage;

use crate::error::{MediaError, MediaResult};

/// One encoded still frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStill {
    /// Encoded bytes
    pub data: Bytes,
    /// MIME type of `data`
    pub mime_type: String,
    /// Source width
    pub width: u32,
    /// Source height
    pub height: u32,
}

impl EncodedStill {
    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }

    /// Encoded size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the encoder produced nothing
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Synchronous still encoder
pub trait StillEncoder: Send + Sync + std::fmt::Debug {
    /// Encode one RGB frame
    fn encode(&self, image: &RgbImage) -> MediaResult<EncodedStill>;
}

/// JPEG still encoder
#[derive(Debug, Clone)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// Default quality, close to what browsers use for canvas exports
    pub const DEFAULT_QUALITY: u8 = 92;

    /// Create encoder with the given quality (1-100)
    pub fn new(quality: u8) -> MediaResult<Self> {
        if quality == 0 || quality > 100 {
            return Err(MediaError::InvalidConfiguration {
                message: format!("JPEG quality must be within 1..=100, got {}", quality),
            });
        }
        Ok(Self { quality })
    }

    /// Configured quality
    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self {
            quality: Self::DEFAULT_QUALITY,
        }
    }
}

impl StillEncoder for JpegEncoder {
    fn encode(&self, image: &RgbImage) -> MediaResult<EncodedStill> {
        let mut buffer = Vec::new();
        let mut encoder = ImageJpegEncoder::new_with_quality(&mut buffer, self.quality);
        encoder
            .encode_image(image)
            .map_err(|e| MediaError::EncodingFailed {
                codec: "jpeg".to_string(),
                reason: e.to_string(),
            })?;

        Ok(EncodedStill {
            data: Bytes::from(buffer),
            mime_type: "image/jpeg".to_string(),
            width: image.width(),
            height: image.height(),
        })
    }
}
