use crate::core::video::text_detector::DetectionResult;

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    NoFramesExtracted,
}

/// Outcome of scanning one video
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub violation: bool,
    /// Text of the earliest flagged frame
    pub offending_text: Option<String>,
    pub offending_frame: Option<usize>,
    pub frames_scanned: usize,
}

impl Verdict {
    pub fn clean(frames_scanned: usize) -> Self {
        Self {
            violation: false,
            offending_text: None,
            offending_frame: None,
            frames_scanned,
        }
    }

    pub fn violated(frame_index: usize, text: String) -> Self {
        Self {
            violation: true,
            offending_text: Some(text),
            offending_frame: Some(frame_index),
            frames_scanned: frame_index + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationState {
    Sampling,
    Scanning {
        frame_index: usize,
        frame_count: usize,
    },
    Violated {
        frame_index: usize,
        text: String,
    },
    Clean {
        frames_scanned: usize,
    },
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Sampled { frame_count: usize },
    SampleFailed,
    Detected(DetectionResult),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanAction {
    /// Run the detector on this frame next
    Detect(usize),
    Finish(Verdict),
    Abort(FailureReason),
    /// Event doesn't apply to the current state
    Wait,
}

impl ClassificationState {
    pub fn new() -> Self {
        ClassificationState::Sampling
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClassificationState::Violated { .. }
                | ClassificationState::Clean { .. }
                | ClassificationState::Failed(_)
        )
    }

    pub fn transition(&self, event: ScanEvent) -> (ClassificationState, ScanAction) {
        match (self, event) {
            (ClassificationState::Sampling, ScanEvent::Sampled { frame_count: 0 })
            | (ClassificationState::Sampling, ScanEvent::SampleFailed) => (
                ClassificationState::Failed(FailureReason::NoFramesExtracted),
                ScanAction::Abort(FailureReason::NoFramesExtracted),
            ),

            (ClassificationState::Sampling, ScanEvent::Sampled { frame_count }) => (
                ClassificationState::Scanning {
                    frame_index: 0,
                    frame_count,
                },
                ScanAction::Detect(0),
            ),

            (
                ClassificationState::Scanning {
                    frame_index,
                    frame_count,
                },
                ScanEvent::Detected(result),
            ) => {
                if result.frame_index != *frame_index {
                    return (self.clone(), ScanAction::Detect(*frame_index));
                }

                if result.text_present {
                    (
                        ClassificationState::Violated {
                            frame_index: *frame_index,
                            text: result.text.clone(),
                        },
                        ScanAction::Finish(Verdict::violated(*frame_index, result.text)),
                    )
                } else if frame_index + 1 >= *frame_count {
                    (
                        ClassificationState::Clean {
                            frames_scanned: *frame_count,
                        },
                        ScanAction::Finish(Verdict::clean(*frame_count)),
                    )
                } else {
                    (
                        ClassificationState::Scanning {
                            frame_index: frame_index + 1,
                            frame_count: *frame_count,
                        },
                        ScanAction::Detect(frame_index + 1),
                    )
                }
            }

            (ClassificationState::Violated { frame_index, text }, _) => (
                self.clone(),
                ScanAction::Finish(Verdict::violated(*frame_index, text.clone())),
            ),
            (ClassificationState::Clean { frames_scanned }, _) => {
                (self.clone(), ScanAction::Finish(Verdict::clean(*frames_scanned)))
            }
            (ClassificationState::Failed(reason), _) => {
                (self.clone(), ScanAction::Abort(reason.clone()))
            }

            _ => (self.clone(), ScanAction::Wait),
        }
    }
}

impl Default for ClassificationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives [`ClassificationState`] for one video
pub struct ScanMachine {
    state: ClassificationState,
    detections: usize,
}

impl ScanMachine {
    pub fn new() -> Self {
        Self {
            state: ClassificationState::new(),
            detections: 0,
        }
    }

    pub fn handle(&mut self, event: ScanEvent) -> ScanAction {
        if matches!(event, ScanEvent::Detected(_)) {
            self.detections += 1;
        }

        let (new_state, action) = self.state.transition(event);
        self.state = new_state;

        action
    }

    pub fn current_state(&self) -> &ClassificationState {
        &self.state
    }

    pub fn detections(&self) -> usize {
        self.detections
    }
}

impl Default for ScanMachine {
    fn default() -> Self {
        Self::new()
    }
}
