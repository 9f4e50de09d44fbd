pub mod pipeline;
pub mod remote;
pub mod video;
