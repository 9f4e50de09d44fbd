//! Text-on-screen screening for short-form video
//!
//! 1. Sample frames at a fixed rate into a per-video workspace
//! 2. OCR each frame in temporal order
//! 3. Stop at the first frame with text; a clean video is scanned to the end

pub mod classifier;
pub mod compiler;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod process;
pub mod sampler;
pub mod state_machine;
pub mod text_detector;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{Classification, ViolationClassifier};
pub use compiler::{CompileSettings, FfmpegCompiler, VideoCompiler};
pub use decoder::{FfmpegDecoder, FrameDecoder};
pub use error::VideoError;
pub use frame::{Frame, FrameInfo, VideoSource};
pub use sampler::{FrameSampler, SampledVideo, SamplerConfig};
pub use state_machine::{ClassificationState, ScanMachine, Verdict};
pub use text_detector::{
    DetectionResult, MockTextDetector, OcrEngine, OcrTextDetector, RecognitionError,
    TesseractConfig, TesseractEngine, TextDetector,
};
pub use workspace::{CleanupPolicy, ScratchWorkspace, WorkspaceFactory};
