//! Test doubles shared by the video and pipeline tests.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::video::decoder::FrameDecoder;
use crate::core::video::error::VideoError;

/// Decoder that treats the input file as a script: `|`-separated frame
/// contents, written verbatim as frame files. An empty input yields no frames.
pub struct ScriptedDecoder;

impl ScriptedDecoder {
    pub fn frame_path(pattern: &Path, number: usize) -> PathBuf {
        let name = pattern
            .file_name()
            .map(|n| n.to_string_lossy().replace("%06d", &format!("{:06}", number)))
            .unwrap_or_default();
        pattern.with_file_name(name)
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn decode(&self, input: &Path, _rate: f64, output_pattern: &Path) -> Result<(), VideoError> {
        let script = fs::read_to_string(input)?;
        if script.is_empty() {
            return Ok(());
        }
        for (i, content) in script.split('|').enumerate() {
            fs::write(Self::frame_path(output_pattern, i + 1), content)?;
        }
        Ok(())
    }
}
