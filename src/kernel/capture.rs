use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use tracing::{debug, warn};

use crate::error::{Result, TelemetryError};

const JPEG_QUALITY: u8 = 60;

/// Optional screenshot provider for feedback and reroute payloads.
/// Returning None is always acceptable; event construction never depends on it.
pub trait ScreenCapture: Send + Sync {
    fn capture(&self, max_dimension: u32) -> Option<Vec<u8>>;
}

/// Raw frame grabber behind [`FrameCapture`].
pub trait FrameSource: Send + Sync {
    fn grab(&self) -> Result<DynamicImage>;
}

/// Grabs a frame, shrinks it to fit `max_dimension` and encodes it as JPEG.
pub struct FrameCapture<F> {
    source: F,
}

impl<F: FrameSource> FrameCapture<F> {
    pub fn new(source: F) -> Self {
        Self { source }
    }

    fn capture_jpeg(&self, max_dimension: u32) -> Result<Vec<u8>> {
        let frame = self.source.grab()?;
        let (w, h) = frame.dimensions();
        let frame = if max_dimension > 0 && (w > max_dimension || h > max_dimension) {
            frame.resize(max_dimension, max_dimension, FilterType::Triangle)
        } else {
            frame
        };

        let mut buf = Vec::new();
        frame
            .write_to(&mut buf, ImageOutputFormat::Jpeg(JPEG_QUALITY))
            .map_err(|e| TelemetryError::ScreenCapture(e.to_string()))?;
        debug!("Captured {}x{} frame ({} bytes)", frame.width(), frame.height(), buf.len());
        Ok(buf)
    }
}

impl<F: FrameSource> ScreenCapture for FrameCapture<F> {
    fn capture(&self, max_dimension: u32) -> Option<Vec<u8>> {
        match self.capture_jpeg(max_dimension) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Screenshot skipped: {}", e);
                None
            }
        }
    }
}

/// Solid-colour frame. Stands in for a real display grabber in demos.
#[derive(Debug, Clone, Copy)]
pub struct SolidFrame {
    pub width: u32,
    pub height: u32,
}

impl FrameSource for SolidFrame {
    fn grab(&self) -> Result<DynamicImage> {
        if self.width == 0 || self.height == 0 {
            return Err(TelemetryError::ScreenCapture("empty frame".to_string()));
        }
        Ok(DynamicImage::new_rgb8(self.width, self.height))
    }
}

pub fn encode_screenshot(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_frames_are_shrunk() {
        let capture = FrameCapture::new(SolidFrame { width: 1000, height: 500 });
        let bytes = capture.capture(250).expect("jpeg");
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!(decoded.dimensions(), (250, 125));
    }

    #[test]
    fn failed_grab_yields_nothing() {
        let capture = FrameCapture::new(SolidFrame { width: 0, height: 0 });
        assert!(capture.capture(250).is_none());
    }
}
