pub mod drive;
pub mod record;

pub use drive::{DriveFile, UploadedFile};
pub use record::{AirtableRecord, CandidateVideo, ListRecordsResponse};
