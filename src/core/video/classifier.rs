use log::{error, info, warn};

use crate::core::video::error::VideoError;
use crate::core::video::frame::{Frame, FrameInfo, VideoSource};
use crate::core::video::sampler::FrameSampler;
use crate::core::video::state_machine::{FailureReason, ScanAction, ScanEvent, ScanMachine, Verdict};
use crate::core::video::text_detector::TextDetector;
use crate::core::video::workspace::ScratchWorkspace;

/// Verdict for one video, still holding the frames it was computed from.
///
/// Dropping this (or calling [`Classification::into_verdict`]) releases the
/// workspace according to its cleanup policy.
#[derive(Debug)]
pub struct Classification {
    pub verdict: Verdict,
    pub frames: Vec<Frame>,
    pub workspace: ScratchWorkspace,
}

impl Classification {
    pub fn offending_frame(&self) -> Option<FrameInfo> {
        self.verdict
            .offending_frame
            .and_then(|index| self.frames.get(index))
            .map(FrameInfo::from_frame)
    }

    pub fn into_verdict(self) -> Verdict {
        self.verdict
    }
}

pub struct ViolationClassifier {
    sampler: FrameSampler,
    detector: Box<dyn TextDetector>,
}

impl ViolationClassifier {
    pub fn new(sampler: FrameSampler, detector: Box<dyn TextDetector>) -> Self {
        Self { sampler, detector }
    }

    pub fn classify(
        &self,
        video_id: &str,
        source: &VideoSource,
    ) -> Result<Classification, VideoError> {
        let mut machine = ScanMachine::new();

        let sampled = match self.sampler.sample(video_id, source) {
            Ok(sampled) => sampled,
            Err(e) => {
                if matches!(e, VideoError::NoFramesExtracted(_)) {
                    machine.handle(ScanEvent::SampleFailed);
                }
                error!("❌ Sampling failed for {}: {}", video_id, e);
                return Err(e);
            }
        };

        let mut action = machine.handle(ScanEvent::Sampled {
            frame_count: sampled.frames.len(),
        });

        let verdict = loop {
            match action {
                ScanAction::Detect(index) => {
                    let result = self.detector.detect(&sampled.frames[index]);
                    action = machine.handle(ScanEvent::Detected(result));
                }
                ScanAction::Finish(verdict) => break verdict,
                ScanAction::Abort(FailureReason::NoFramesExtracted) | ScanAction::Wait => {
                    return Err(VideoError::NoFramesExtracted(video_id.to_string()));
                }
            }
        };

        let classification = Classification {
            verdict,
            frames: sampled.frames,
            workspace: sampled.workspace,
        };

        if classification.verdict.violation {
            let at = classification
                .offending_frame()
                .map(|f| f.timestamp_ms)
                .unwrap_or_default();
            warn!(
                "🚫 {} flagged at {} ms after {} frame(s): {:?}",
                video_id,
                at,
                machine.detections(),
                classification.verdict.offending_text.as_deref().unwrap_or_default()
            );
        } else {
            info!(
                "✅ {} clean after scanning {} frame(s)",
                video_id,
                machine.detections()
            );
        }

        Ok(classification)
    }
}
