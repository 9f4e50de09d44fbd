use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use log::debug;

use crate::core::video::error::VideoError;
use crate::core::video::process::{run_with_timeout, ProcessError};

/// External decoder capability: write one still per `1 / rate_per_second`
/// seconds of `input`, numbered sequentially through `output_pattern`.
pub trait FrameDecoder: Send + Sync {
    fn decode(
        &self,
        input: &Path,
        rate_per_second: f64,
        output_pattern: &Path,
    ) -> Result<(), VideoError>;
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for std::sync::Arc<D> {
    fn decode(
        &self,
        input: &Path,
        rate_per_second: f64,
        output_pattern: &Path,
    ) -> Result<(), VideoError> {
        (**self).decode(input, rate_per_second, output_pattern)
    }
}

pub struct FfmpegDecoder {
    program: String,
    threads: usize,
    timeout: Duration,
}

impl FfmpegDecoder {
    pub fn new(program: impl Into<String>, threads: usize, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            threads: threads.max(1),
            timeout,
        }
    }

    fn build_args(&self, input: &Path, rate_per_second: f64, output_pattern: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-nostdin"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push("-threads".into());
        args.push(self.threads.to_string().into());
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
        args.push("-an".into());
        args.push("-sn".into());
        args.push("-vf".into());
        args.push(format!("fps={}", rate_per_second).into());
        args.push("-y".into());
        args.push(output_pattern.as_os_str().to_owned());
        args
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg", num_cpus::get().min(4), Duration::from_secs(120))
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn decode(
        &self,
        input: &Path,
        rate_per_second: f64,
        output_pattern: &Path,
    ) -> Result<(), VideoError> {
        let args = self.build_args(input, rate_per_second, output_pattern);
        debug!("🎞️ {} {:?}", self.program, args);

        let output = run_with_timeout(Command::new(&self.program).args(&args), self.timeout)
            .map_err(|e| match e {
                ProcessError::TimedOut { timeout, .. } => VideoError::DecodeTimeout(timeout),
                ProcessError::Spawn { program, source } | ProcessError::Wait { program, source } => {
                    VideoError::Spawn { program, source }
                }
            })?;

        if !output.success() {
            return Err(VideoError::DecoderFailed {
                status: output.status.to_string(),
                stderr: output.stderr,
            });
        }

        Ok(())
    }
}
