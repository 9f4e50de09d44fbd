use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};

use minicomp::api::{build_orchestrator, VideoModerator};
use minicomp::config::PipelineConfig;

/// Screens short videos for on-screen text and compiles the clean ones
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON5 config file; defaults plus environment when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review every candidate in the record store
    Run {
        /// Stop after this many uploaded compilations
        #[arg(long)]
        max_batches: Option<usize>,

        /// Leave extracted frames on disk
        #[arg(long)]
        keep_frames: bool,
    },
    /// Classify one local video and print the verdict
    Check {
        video: PathBuf,

        #[arg(long)]
        keep_frames: bool,

        /// Frames sampled per second of video
        #[arg(long)]
        frame_rate: Option<f64>,
    },
}

#[derive(ValueEnum, Clone, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    minicomp::init_logging(args.log_level.as_filter());

    let mut config = match PipelineConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Command::Run {
            max_batches,
            keep_frames,
        } => {
            if max_batches.is_some() {
                config.pipeline.max_batches = max_batches;
            }
            config.workspace.keep_frames |= keep_frames;
            run(&config)
        }
        Command::Check {
            video,
            keep_frames,
            frame_rate,
        } => {
            if let Some(rate) = frame_rate {
                config.sampler.frame_rate = rate;
            }
            config.workspace.keep_frames |= keep_frames;
            check(&config, video)
        }
    }
}

fn run(config: &PipelineConfig) -> ExitCode {
    if let Err(e) = config.validate_for_run() {
        error!("❌ {}", e);
        return ExitCode::FAILURE;
    }

    let orchestrator = match build_orchestrator(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("❌ Failed to set up clients: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match orchestrator.run() {
        Ok(summary) => {
            println!(
                "candidates: {}  violations: {}  failures: {}  skipped: {}  leftover: {}",
                summary.candidates,
                summary.violations,
                summary.failures,
                summary.skipped,
                summary.leftover
            );
            for batch in &summary.batches {
                println!("{} [{}] {}", batch.output_name, batch.record_ids.join(", "), batch.link);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Run aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn check(config: &PipelineConfig, video: PathBuf) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("❌ {}", e);
        return ExitCode::FAILURE;
    }

    let moderator = VideoModerator::from_config(config);
    match moderator.check_file(&video) {
        Ok(report) => {
            if report.violation {
                println!(
                    "VIOLATION {} at {} ms: {:?}",
                    report.video_id,
                    report.offending_timestamp_ms.unwrap_or_default(),
                    report.offending_text.unwrap_or_default()
                );
            } else {
                println!(
                    "CLEAN {} ({} frames scanned)",
                    report.video_id, report.frames_scanned
                );
            }
            if let Some(dir) = report.frames_dir {
                info!("📌 Frames kept in {:?}", dir);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Could not classify {:?}: {}", video, e);
            ExitCode::FAILURE
        }
    }
}
