use thiserror::Error;

use crate::core::remote::RemoteError;
use crate::core::video::VideoError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to list candidate videos: {0}")]
    Candidates(#[source] RemoteError),
    #[error("Failed to download video for {record_id}: {source}")]
    Fetch {
        record_id: String,
        #[source]
        source: RemoteError,
    },
    #[error("Failed to save video for {record_id}: {source}")]
    Save {
        record_id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to classify {record_id}: {source}")]
    Classify {
        record_id: String,
        #[source]
        source: VideoError,
    },
    #[error("Failed to compile batch [{}]: {source}", .record_ids.join(", "))]
    Compile {
        record_ids: Vec<String>,
        #[source]
        source: VideoError,
    },
    #[error("Failed to upload {name}: {source}")]
    Upload {
        name: String,
        #[source]
        source: RemoteError,
    },
    #[error("Failed to set {field:?} on {record_id}: {source}")]
    Mark {
        record_id: String,
        field: String,
        #[source]
        source: RemoteError,
    },
}

impl PipelineError {
    /// Fatal errors end the run; the rest only cost the current record
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Candidates(_)
                | PipelineError::Compile { .. }
                | PipelineError::Upload { .. }
        )
    }
}
