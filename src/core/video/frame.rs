use std::path::{Path, PathBuf};
use std::time::Duration;

use image::GrayImage;

/// Candidate video handed to the sampler
#[derive(Debug, Clone)]
pub enum VideoSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl VideoSource {
    pub fn describe(&self) -> String {
        match self {
            VideoSource::Path(path) => path.display().to_string(),
            VideoSource::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

/// One still image sampled from a video, stored in a scratch workspace
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub path: PathBuf,
    pub timestamp: Duration,
}

impl Frame {
    pub fn new(index: usize, path: PathBuf, frame_rate: f64) -> Self {
        let timestamp = if frame_rate > 0.0 {
            Duration::try_from_secs_f64(index as f64 / frame_rate).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };

        Self {
            index,
            path,
            timestamp,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the frame as grayscale, shrinking it to `max_width` if wider
    pub fn load_luma(&self, max_width: u32) -> Result<GrayImage, image::ImageError> {
        let gray = image::open(&self.path)?.to_luma8();

        if max_width == 0 || gray.width() <= max_width {
            return Ok(gray);
        }

        let target_height =
            ((gray.height() as u64 * max_width as u64) / gray.width() as u64).max(1) as u32;
        Ok(image::imageops::resize(
            &gray,
            max_width,
            target_height,
            image::imageops::FilterType::Triangle,
        ))
    }
}

/// Frame metadata (lightweight, for logs and verdicts)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub index: usize,
    pub timestamp_ms: u64,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            index: frame.index,
            timestamp_ms: frame.timestamp.as_millis() as u64,
        }
    }
}
