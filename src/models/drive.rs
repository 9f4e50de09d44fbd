use serde::{Deserialize, Serialize};

/// `files/{id}` metadata as requested with `fields=id,name,webViewLink,thumbnailLink`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
}

/// Body returned when the resumable upload completes
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadMetadata<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<&'a str>,
    pub mime_type: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Permission<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub role: &'a str,
}

impl Permission<'static> {
    pub fn public_reader() -> Self {
        Self {
            kind: "anyone",
            role: "reader",
        }
    }
}
