use std::io::Write;

use log::{debug, info, warn};

use crate::core::video::decoder::FrameDecoder;
use crate::core::video::error::VideoError;
use crate::core::video::frame::{Frame, VideoSource};
use crate::core::video::workspace::{ScratchWorkspace, WorkspaceFactory};

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub frame_rate: f64,
    pub frame_extension: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 1.0,
            frame_extension: "png".to_string(),
        }
    }
}

/// Frames of one video plus the workspace that holds them
#[derive(Debug)]
pub struct SampledVideo {
    pub frames: Vec<Frame>,
    pub workspace: ScratchWorkspace,
}

pub struct FrameSampler {
    decoder: Box<dyn FrameDecoder>,
    workspaces: WorkspaceFactory,
    config: SamplerConfig,
}

impl FrameSampler {
    pub fn new(decoder: Box<dyn FrameDecoder>, workspaces: WorkspaceFactory) -> Self {
        Self::with_config(decoder, workspaces, SamplerConfig::default())
    }

    pub fn with_config(
        decoder: Box<dyn FrameDecoder>,
        workspaces: WorkspaceFactory,
        config: SamplerConfig,
    ) -> Self {
        Self {
            decoder,
            workspaces,
            config,
        }
    }

    pub fn sample(&self, video_id: &str, source: &VideoSource) -> Result<SampledVideo, VideoError> {
        let rate = self.config.frame_rate;
        if rate <= 0.0 || !rate.is_finite() {
            return Err(VideoError::InvalidFrameRate(rate));
        }

        let workspace = self.workspaces.allocate(video_id)?;
        let pattern = workspace.frame_pattern(&self.config.frame_extension);

        info!(
            "🎬 Sampling {} ({}) at {} fps",
            video_id,
            source.describe(),
            rate
        );

        let decoded = match source {
            VideoSource::Path(path) => self.decoder.decode(path, rate, &pattern),
            VideoSource::Bytes(bytes) => {
                // Decoders need a seekable file, not a stream
                let mut temp = tempfile::Builder::new()
                    .prefix("source_")
                    .suffix(".mp4")
                    .tempfile_in(workspace.path())?;
                temp.write_all(bytes)?;
                temp.flush()?;
                debug!("💾 Persisted {} bytes to {:?}", bytes.len(), temp.path());
                self.decoder.decode(temp.path(), rate, &pattern)
            }
        };

        match decoded {
            Ok(()) => {}
            Err(VideoError::DecoderFailed { status, stderr }) => {
                warn!(
                    "⚠️ Decoder exited with {} for {}: {}",
                    status, video_id, stderr
                );
            }
            Err(e) => return Err(e),
        }

        let frames: Vec<Frame> = workspace
            .list_frames(&self.config.frame_extension)?
            .into_iter()
            .enumerate()
            .map(|(index, path)| Frame::new(index, path, rate))
            .collect();

        if frames.is_empty() {
            return Err(VideoError::NoFramesExtracted(video_id.to_string()));
        }

        info!("✅ Extracted {} frames for {}", frames.len(), video_id);
        Ok(SampledVideo { frames, workspace })
    }
}
