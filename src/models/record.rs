use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One page of `GET /{base}/{table}`
#[derive(Debug, Clone, Deserialize)]
pub struct ListRecordsResponse {
    #[serde(default)]
    pub records: Vec<AirtableRecord>,
    /// Present while more pages remain
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl AirtableRecord {
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn into_candidate(self, url_field: &str) -> CandidateVideo {
        let download_url = self.text_field(url_field).map(str::to_string);
        CandidateVideo {
            record_id: self.id,
            download_url,
        }
    }
}

/// A record that may point at a video awaiting review
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateVideo {
    pub record_id: String,
    pub download_url: Option<String>,
}
