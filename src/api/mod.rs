pub mod moderation;
pub mod pipeline;

pub use moderation::{ModerationReport, VideoModerator};
pub use pipeline::build_orchestrator;
