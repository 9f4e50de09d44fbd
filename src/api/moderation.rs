//! Single-video moderation

use std::path::{Path, PathBuf};

use log::info;

use crate::config::PipelineConfig;
use crate::core::video::{
    Classification, CleanupPolicy, FfmpegDecoder, FrameSampler, OcrTextDetector, TesseractEngine,
    VideoError, VideoSource, ViolationClassifier, WorkspaceFactory,
};

/// What `minicomp check` prints for one video
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationReport {
    pub video_id: String,
    pub violation: bool,
    pub offending_text: Option<String>,
    pub offending_timestamp_ms: Option<u64>,
    pub frames_scanned: usize,
    /// Set when the frames were kept on disk
    pub frames_dir: Option<PathBuf>,
}

impl ModerationReport {
    fn from_classification(video_id: &str, classification: Classification) -> Self {
        let offending_timestamp_ms = classification.offending_frame().map(|f| f.timestamp_ms);
        let frames_dir = match classification.workspace.policy() {
            CleanupPolicy::Keep => Some(classification.workspace.path().to_path_buf()),
            CleanupPolicy::Erase => None,
        };
        let verdict = classification.into_verdict();

        Self {
            video_id: video_id.to_string(),
            violation: verdict.violation,
            offending_text: verdict.offending_text,
            offending_timestamp_ms,
            frames_scanned: verdict.frames_scanned,
            frames_dir,
        }
    }
}

/// Classifier wired to ffmpeg and tesseract as configured
pub(crate) fn build_classifier(config: &PipelineConfig) -> ViolationClassifier {
    let decoder = FfmpegDecoder::new(
        config.sampler.decoder_program.clone(),
        config.sampler.decoder_threads,
        config.sampler.decode_timeout(),
    );
    let workspaces = WorkspaceFactory::new(
        config.workspace.root.clone(),
        config.workspace.cleanup_policy(),
    );
    let sampler = FrameSampler::with_config(
        Box::new(decoder),
        workspaces,
        config.sampler.sampler_config(),
    );
    let detector =
        OcrTextDetector::new(TesseractEngine::with_config(config.ocr.tesseract_config()));

    ViolationClassifier::new(sampler, Box::new(detector))
}

pub struct VideoModerator {
    classifier: ViolationClassifier,
}

impl VideoModerator {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::with_classifier(build_classifier(config))
    }

    pub fn with_classifier(classifier: ViolationClassifier) -> Self {
        info!("🎬 VideoModerator: created");
        Self { classifier }
    }

    /// The file stem doubles as the video id
    pub fn check_file(&self, path: &Path) -> Result<ModerationReport, VideoError> {
        if !path.is_file() {
            return Err(VideoError::MissingInput(path.to_path_buf()));
        }
        let video_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        let classification = self
            .classifier
            .classify(&video_id, &VideoSource::Path(path.to_path_buf()))?;
        Ok(ModerationReport::from_classification(&video_id, classification))
    }

    pub fn check_bytes(&self, video_id: &str, bytes: Vec<u8>) -> Result<ModerationReport, VideoError> {
        let classification = self
            .classifier
            .classify(video_id, &VideoSource::Bytes(bytes))?;
        Ok(ModerationReport::from_classification(video_id, classification))
    }
}

impl Drop for VideoModerator {
    fn drop(&mut self) {
        info!("🗑️ VideoModerator: released");
    }
}
