//! Concatenates accepted clips into one portrait compilation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::core::video::error::VideoError;
use crate::core::video::process::{run_with_timeout, ProcessError};

pub trait VideoCompiler: Send + Sync {
    /// Concatenate `inputs` in order into `output`
    fn compile(&self, inputs: &[PathBuf], output: &Path) -> Result<(), VideoError>;
}

impl<C: VideoCompiler + ?Sized> VideoCompiler for Arc<C> {
    fn compile(&self, inputs: &[PathBuf], output: &Path) -> Result<(), VideoError> {
        (**self).compile(inputs, output)
    }
}

#[derive(Debug, Clone)]
pub struct CompileSettings {
    pub program: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub crf: u8,
    pub preset: String,
    pub include_audio: bool,
    pub timeout: Duration,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self::portrait_1080p()
    }
}

impl CompileSettings {
    pub fn portrait_1080p() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            width: 1080,
            height: 1920,
            fps: 30,
            crf: 23,
            preset: "medium".to_string(),
            include_audio: true,
            timeout: Duration::from_secs(900),
        }
    }
}

pub struct FfmpegCompiler {
    settings: CompileSettings,
}

impl FfmpegCompiler {
    pub fn new(settings: CompileSettings) -> Self {
        Self { settings }
    }

    /// Scale to cover the target, center-crop, then concat in input order
    fn filter_graph(&self, input_count: usize) -> String {
        let s = &self.settings;
        let mut graph = String::new();

        for i in 0..input_count {
            graph.push_str(&format!(
                "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,fps={fps}[v{i}];",
                i = i,
                w = s.width,
                h = s.height,
                fps = s.fps
            ));
        }

        for i in 0..input_count {
            graph.push_str(&format!("[v{}]", i));
            if s.include_audio {
                graph.push_str(&format!("[{}:a]", i));
            }
        }

        let audio_streams = if s.include_audio { 1 } else { 0 };
        graph.push_str(&format!(
            "concat=n={}:v=1:a={}[outv]",
            input_count, audio_streams
        ));
        if s.include_audio {
            graph.push_str("[outa]");
        }
        graph
    }

    fn build_args(&self, inputs: &[PathBuf], output: &Path) -> Vec<OsString> {
        let s = &self.settings;
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into(), "-y".into()];

        for input in inputs {
            args.push("-i".into());
            args.push(input.as_os_str().to_owned());
        }

        args.push("-filter_complex".into());
        args.push(self.filter_graph(inputs.len()).into());
        args.push("-map".into());
        args.push("[outv]".into());
        if s.include_audio {
            args.push("-map".into());
            args.push("[outa]".into());
            args.push("-c:a".into());
            args.push("aac".into());
        }
        args.push("-c:v".into());
        args.push("libx264".into());
        args.push("-preset".into());
        args.push(s.preset.clone().into());
        args.push("-crf".into());
        args.push(s.crf.to_string().into());
        args.push("-pix_fmt".into());
        args.push("yuv420p".into());
        args.push("-movflags".into());
        args.push("+faststart".into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl Default for FfmpegCompiler {
    fn default() -> Self {
        Self::new(CompileSettings::default())
    }
}

impl VideoCompiler for FfmpegCompiler {
    fn compile(&self, inputs: &[PathBuf], output: &Path) -> Result<(), VideoError> {
        if inputs.is_empty() {
            return Err(VideoError::EmptyCompilation);
        }
        if let Some(missing) = inputs.iter().find(|p| !p.is_file()) {
            return Err(VideoError::MissingInput(missing.clone()));
        }

        info!(
            "🎞️ Compiling {} clips into {:?} ({}x{})",
            inputs.len(),
            output,
            self.settings.width,
            self.settings.height
        );

        let result = run_with_timeout(
            Command::new(&self.settings.program).args(self.build_args(inputs, output)),
            self.settings.timeout,
        );

        let output_status = match result {
            Ok(out) => out,
            Err(ProcessError::TimedOut { timeout, .. }) => {
                return Err(VideoError::CompileTimeout(timeout))
            }
            Err(ProcessError::Spawn { program, source })
            | Err(ProcessError::Wait { program, source }) => {
                return Err(VideoError::Spawn { program, source })
            }
        };

        if !output_status.success() {
            return Err(VideoError::CompileFailed(format!(
                "{} exited with {}: {}",
                self.settings.program, output_status.status, output_status.stderr
            )));
        }

        Ok(())
    }
}
