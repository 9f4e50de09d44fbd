//! Record store and blob transfer clients

pub mod airtable;
pub mod blob;
pub mod error;

pub use airtable::{AirtableClient, RecordStore};
pub use blob::{BlobFetch, BlobStore, DriveUploader, HttpFetcher};
pub use error::RemoteError;
