use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};

use crate::capture::domain::video_source::CaptureError;
use crate::shared::frame::Frame;
use crate::shared::settings::ClientSettings;

/// Encodes captured stills into the fixed wire format: JPEG at a fixed
/// resolution. Stills of any other size are resized first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegFrameEncoder {
    width: u32,
    height: u32,
    quality: u8,
}

impl JpegFrameEncoder {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(
            settings.capture_width,
            settings.capture_height,
            settings.jpeg_quality,
        )
    }

    pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>, CaptureError> {
        let img = frame.to_rgb_image().ok_or(CaptureError::InvalidFrame {
            width: frame.width(),
            height: frame.height(),
        })?;

        let img = if img.dimensions() != (self.width, self.height) {
            imageops::resize(&img, self.width, self.height, FilterType::Triangle)
        } else {
            img
        };

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode_image(&img)
            .map_err(CaptureError::Encode)?;
        Ok(out)
    }
}
