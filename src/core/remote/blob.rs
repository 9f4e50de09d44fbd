use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};

use crate::config::DriveConfig;
use crate::core::remote::error::{check_status, RemoteError};
use crate::models::drive::{DriveFile, Permission, UploadMetadata, UploadedFile};

const VIDEO_MIME: &str = "video/mp4";

pub trait BlobFetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError>;
}

pub trait BlobStore: Send + Sync {
    /// Upload `path` as `name`, returning a link anyone can open
    fn upload(&self, path: &Path, name: &str) -> Result<String, RemoteError>;
}

impl<F: BlobFetch + ?Sized> BlobFetch for Arc<F> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        (**self).fetch(url)
    }
}

impl<S: BlobStore + ?Sized> BlobStore for Arc<S> {
    fn upload(&self, path: &Path, name: &str) -> Result<String, RemoteError> {
        (**self).upload(path, name)
    }
}

/// Plain GET download of video bytes
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl BlobFetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let response = check_status(self.client.get(url).send()?)?;
        let bytes = response.bytes()?;
        debug!("⬇️ Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Google Drive v3 resumable uploads
pub struct DriveUploader {
    client: Client,
    access_token: String,
    folder_id: Option<String>,
    upload_base: String,
    api_base: String,
}

impl DriveUploader {
    pub fn new(config: &DriveConfig) -> Result<Self, RemoteError> {
        let access_token = config
            .access_token
            .clone()
            .ok_or(RemoteError::MissingField("drive.access_token"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            access_token,
            folder_id: config.folder_id.clone(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn open_session(&self, name: &str, size: u64) -> Result<String, RemoteError> {
        let metadata = UploadMetadata {
            name,
            parents: self.folder_id.as_deref().into_iter().collect(),
            mime_type: VIDEO_MIME,
        };

        let response = self
            .client
            .post(format!("{}/files?uploadType=resumable", self.upload_base))
            .bearer_auth(&self.access_token)
            .header("X-Upload-Content-Type", VIDEO_MIME)
            .header("X-Upload-Content-Length", size)
            .json(&metadata)
            .send()?;

        session_location(check_status(response)?.headers())
    }

    fn send_content(&self, session_url: &str, path: &Path, size: u64) -> Result<String, RemoteError> {
        let response = self
            .client
            .put(session_url)
            .header(CONTENT_TYPE, VIDEO_MIME)
            .header(CONTENT_LENGTH, size)
            .body(File::open(path)?)
            .send()?;

        let uploaded: UploadedFile = check_status(response)?.json()?;
        Ok(uploaded.id)
    }

    fn share_publicly(&self, file_id: &str) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(format!("{}/files/{}/permissions", self.api_base, file_id))
            .bearer_auth(&self.access_token)
            .json(&Permission::public_reader())
            .send()?;
        check_status(response)?;
        Ok(())
    }

    pub fn file_info(&self, file_id: &str) -> Result<DriveFile, RemoteError> {
        let response = self
            .client
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id,name,webViewLink,thumbnailLink")])
            .send()?;
        Ok(check_status(response)?.json()?)
    }
}

impl BlobStore for DriveUploader {
    fn upload(&self, path: &Path, name: &str) -> Result<String, RemoteError> {
        let size = std::fs::metadata(path)?.len();
        info!("☁️ Uploading {} ({} bytes)", name, size);

        let session = self.open_session(name, size)?;
        let file_id = self.send_content(&session, path, size)?;
        self.share_publicly(&file_id)?;

        let link = public_link(self.file_info(&file_id)?)?;
        info!("🔗 {} available at {}", name, link);
        Ok(link)
    }
}

fn session_location(headers: &reqwest::header::HeaderMap) -> Result<String, RemoteError> {
    headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(RemoteError::MissingField("Location"))
}

fn public_link(file: DriveFile) -> Result<String, RemoteError> {
    file.web_view_link
        .filter(|l| !l.is_empty())
        .ok_or(RemoteError::MissingField("webViewLink"))
}
