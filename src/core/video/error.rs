use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid frame rate {0}: must be greater than zero")]
    InvalidFrameRate(f64),
    #[error("No frames extracted from video {0}")]
    NoFramesExtracted(String),
    #[error("Decoder timed out after {0:?}")]
    DecodeTimeout(Duration),
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Decoder exited with {status}: {stderr}")]
    DecoderFailed { status: String, stderr: String },
    #[error("Input video missing: {0}")]
    MissingInput(PathBuf),
    #[error("No input videos to compile")]
    EmptyCompilation,
    #[error("Compile failed: {0}")]
    CompileFailed(String),
    #[error("Compile timed out after {0:?}")]
    CompileTimeout(Duration),
}
