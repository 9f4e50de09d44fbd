//! Candidate → verdict → batch → compilation

pub mod batch;
pub mod error;
pub mod orchestrator;

pub use batch::{AcceptedVideo, BatchAccumulator};
pub use error::PipelineError;
pub use orchestrator::{CompiledBatch, Orchestrator, OrchestratorSettings, RunSummary};
