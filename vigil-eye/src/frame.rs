//! Captured frames

use crate::error::VisionError;
use image::RgbImage;
use std::path::Path;
use std::time::Duration;

/// One RGB frame and where it sits in the session
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Zero-based position in the stream
    pub sequence: u64,
    /// Time since the session started
    pub captured_at: Duration,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64, captured_at: Duration) -> Self {
        Self {
            image,
            sequence,
            captured_at,
        }
    }

    /// Load a still image as the first frame of a session
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| VisionError::Processing(format!("Failed to open {}: {}", path.display(), e)))?
            .to_rgb8();
        Ok(Self::new(image, 0, Duration::ZERO))
    }

    /// Blank frame of the given size, for sources that carry no pixels
    pub fn blank(width: u32, height: u32, sequence: u64, captured_at: Duration) -> Self {
        Self::new(RgbImage::new(width, height), sequence, captured_at)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
