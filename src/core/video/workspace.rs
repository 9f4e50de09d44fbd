//! Per-video scratch directories for extracted frames.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::core::video::error::VideoError;

pub const FRAME_PREFIX: &str = "frame_";
/// Frame numbers are zero padded to this width so name order equals time order
pub const FRAME_NUMBER_WIDTH: usize = 6;

static UNSAFE_ID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Remove the directory when the workspace is released
    #[default]
    Erase,
    /// Leave frames on disk for inspection
    Keep,
}

/// Map an arbitrary record/video identifier onto a safe directory name fragment.
///
/// Safe ids are returned unchanged. Anything that had to be rewritten gets a
/// digest of the raw id appended, so distinct ids never share a name.
pub fn sanitize_id(video_id: &str) -> String {
    let cleaned = UNSAFE_ID_CHARS.replace_all(video_id, "_");
    let cleaned = cleaned.trim_matches('_');
    if !cleaned.is_empty() && cleaned == video_id {
        return cleaned.to_string();
    }

    let base = if cleaned.is_empty() { "video" } else { cleaned };
    format!("{}_{}", base, short_digest(video_id))
}

fn short_digest(raw: &str) -> String {
    Sha256::digest(raw.as_bytes())
        .iter()
        .take(6)
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[derive(Debug, Clone)]
pub struct WorkspaceFactory {
    root: PathBuf,
    policy: CleanupPolicy,
}

impl WorkspaceFactory {
    pub fn new(root: impl Into<PathBuf>, policy: CleanupPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    /// Allocate the workspace for `video_id`, discarding stale frames from an aborted run
    pub fn allocate(&self, video_id: &str) -> Result<ScratchWorkspace, VideoError> {
        let path = self.root.join(format!("frames_{}", sanitize_id(video_id)));

        if path.exists() {
            warn!(
                "🧹 Stale workspace for {} found at {:?}, clearing",
                video_id, path
            );
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        debug!("📁 Workspace for {} at {:?}", video_id, path);

        Ok(ScratchWorkspace {
            path,
            video_id: video_id.to_string(),
            policy: self.policy,
            released: false,
        })
    }
}

/// Directory holding the frames of exactly one video
#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    video_id: String,
    policy: CleanupPolicy,
    released: bool,
}

impl ScratchWorkspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    /// Decoder output pattern, e.g. `<dir>/frame_%06d.png`
    pub fn frame_pattern(&self, extension: &str) -> PathBuf {
        self.path.join(format!(
            "{}%0{}d.{}",
            FRAME_PREFIX, FRAME_NUMBER_WIDTH, extension
        ))
    }

    /// Frame files in temporal order
    pub fn list_frames(&self, extension: &str) -> io::Result<Vec<PathBuf>> {
        let mut numbered: Vec<(u64, PathBuf)> = Vec::new();

        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if let Some(number) = frame_number(&path, extension) {
                numbered.push((number, path));
            }
        }

        numbered.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(numbered.into_iter().map(|(_, path)| path).collect())
    }

    /// Remove the workspace now, regardless of policy
    pub fn cleanup(mut self) -> io::Result<()> {
        self.released = true;
        remove_workspace(&self.path)
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.policy {
            CleanupPolicy::Erase => {
                if let Err(e) = remove_workspace(&self.path) {
                    warn!(
                        "❌ Failed to remove workspace {:?} for {}: {}",
                        self.path, self.video_id, e
                    );
                }
            }
            CleanupPolicy::Keep => {
                info!("📌 Keeping frames for {} at {:?}", self.video_id, self.path);
            }
        }
    }
}

fn remove_workspace(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("🗑️ Removed workspace {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn frame_number(path: &Path, extension: &str) -> Option<u64> {
    if path.extension()?.to_str()? != extension {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(FRAME_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
