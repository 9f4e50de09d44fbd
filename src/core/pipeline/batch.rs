use std::path::PathBuf;

use crate::core::video::workspace::sanitize_id;

/// A clean video saved locally and waiting for its batch to fill
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedVideo {
    pub record_id: String,
    pub path: PathBuf,
}

/// Clean videos in acceptance order, flushed once `capacity` is reached
#[derive(Debug)]
pub struct BatchAccumulator {
    capacity: usize,
    videos: Vec<AcceptedVideo>,
}

impl BatchAccumulator {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            videos: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true once the batch is full
    pub fn push(&mut self, video: AcceptedVideo) -> bool {
        self.videos.push(video);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.videos.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    /// Empty the batch, handing back its contents
    pub fn take(&mut self) -> Vec<AcceptedVideo> {
        std::mem::take(&mut self.videos)
    }
}

/// `minicomp_<id1>_<id2>_....mp4`
pub fn compilation_name(videos: &[AcceptedVideo]) -> String {
    let ids: Vec<String> = videos.iter().map(|v| sanitize_id(&v.record_id)).collect();
    format!("minicomp_{}.mp4", ids.join("_"))
}
