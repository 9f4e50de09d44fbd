use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::ImageFormat;
use log::{debug, warn};
use thiserror::Error;

use crate::core::video::frame::Frame;
use crate::core::video::process::{run_with_timeout, ProcessError};

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub frame_index: usize,
    pub text_present: bool,
    pub text: String,
}

impl DetectionResult {
    pub fn from_text(frame_index: usize, text: String) -> Self {
        Self {
            frame_index,
            text_present: !text.is_empty(),
            text,
        }
    }

    pub fn absent(frame_index: usize) -> Self {
        Self {
            frame_index,
            text_present: false,
            text: String::new(),
        }
    }
}

pub trait TextDetector: Send + Sync {
    /// Never fails: a frame that can't be read counts as text-free
    fn detect(&self, frame: &Frame) -> DetectionResult;
}

impl<T: TextDetector + ?Sized> TextDetector for Arc<T> {
    fn detect(&self, frame: &Frame) -> DetectionResult {
        (**self).detect(frame)
    }
}

/// Per-frame OCR failure. Recovered inside [`OcrTextDetector`]
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OCR process error: {0}")]
    Process(#[from] ProcessError),
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// External recognizer: returns the text in one image (empty allowed)
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, frame: &Frame) -> Result<String, RecognitionError>;
}

pub struct OcrTextDetector<E: OcrEngine> {
    engine: E,
}

impl<E: OcrEngine> OcrTextDetector<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

impl<E: OcrEngine> TextDetector for OcrTextDetector<E> {
    fn detect(&self, frame: &Frame) -> DetectionResult {
        match self.engine.recognize(frame) {
            Ok(text) => {
                if !text.is_empty() {
                    debug!("🔤 Frame {} text: {:?}", frame.index, text);
                }
                DetectionResult::from_text(frame.index, text)
            }
            Err(e) => {
                warn!(
                    "⚠️ OCR failed on frame {} ({:?}), treating as text-free: {}",
                    frame.index, frame.path, e
                );
                DetectionResult::absent(frame.index)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TesseractConfig {
    pub program: String,
    pub language: String,
    /// Tesseract `--psm`; engine default when unset
    pub page_segmentation_mode: Option<u8>,
    /// Frames wider than this are downscaled before OCR (0 = never)
    pub max_width: u32,
    pub timeout: Duration,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            program: "tesseract".to_string(),
            language: "eng".to_string(),
            page_segmentation_mode: None,
            max_width: 1280,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TesseractConfig {
    /// Scattered overlay text such as watermarks and stickers
    pub fn for_sparse_text() -> Self {
        Self {
            page_segmentation_mode: Some(11),
            ..Self::default()
        }
    }
}

pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::with_config(TesseractConfig::default())
    }

    pub fn with_config(config: TesseractConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, image_path: &std::path::Path) -> Vec<String> {
        let mut args = vec![
            image_path.to_string_lossy().into_owned(),
            "stdout".to_string(),
            "-l".to_string(),
            self.config.language.clone(),
        ];
        if let Some(psm) = self.config.page_segmentation_mode {
            args.push("--psm".to_string());
            args.push(psm.to_string());
        }
        args
    }

    /// Tesseract pads its output with newlines and emits a lone form feed for blank pages
    fn normalize(raw: &[u8]) -> String {
        String::from_utf8_lossy(raw).trim().to_string()
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, frame: &Frame) -> Result<String, RecognitionError> {
        let gray = frame.load_luma(self.config.max_width)?;

        let prepared = tempfile::Builder::new()
            .prefix("ocr_")
            .suffix(".png")
            .tempfile()?;
        gray.save_with_format(prepared.path(), ImageFormat::Png)?;

        let output = run_with_timeout(
            Command::new(&self.config.program).args(self.build_args(prepared.path())),
            self.config.timeout,
        )?;

        if !output.success() {
            return Err(RecognitionError::Engine(format!(
                "{} exited with {}: {}",
                self.config.program, output.status, output.stderr
            )));
        }

        Ok(Self::normalize(&output.stdout))
    }
}

type TextPattern = Box<dyn Fn(&Frame) -> String + Send + Sync>;

/// Canned detector for tests and dry runs; records every frame it sees
pub struct MockTextDetector {
    text_pattern: Option<TextPattern>,
    calls: AtomicUsize,
    seen: Mutex<Vec<usize>>,
}

impl MockTextDetector {
    pub fn new() -> Self {
        Self {
            text_pattern: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&Frame) -> String + Send + Sync + 'static,
    {
        Self {
            text_pattern: Some(Box::new(pattern)),
            ..Self::new()
        }
    }

    /// Text per frame index; frames past the end are blank
    pub fn with_texts(texts: Vec<&str>) -> Self {
        let texts: Vec<String> = texts.into_iter().map(str::to_string).collect();
        Self::with_pattern(move |frame| texts.get(frame.index).cloned().unwrap_or_default())
    }

    /// Uses each frame file's contents as the recognized text
    pub fn reading_frame_files() -> Self {
        Self::with_pattern(|frame| std::fs::read_to_string(&frame.path).unwrap_or_default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_frames(&self) -> Vec<usize> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockTextDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDetector for MockTextDetector {
    fn detect(&self, frame: &Frame) -> DetectionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(frame.index);
        }

        let text = self
            .text_pattern
            .as_ref()
            .map(|p| p(frame))
            .unwrap_or_default();

        DetectionResult::from_text(frame.index, text)
    }
}
