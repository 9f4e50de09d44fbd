use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::config::AirtableConfig;
use crate::core::remote::error::{check_status, RemoteError};
use crate::models::record::{AirtableRecord, CandidateVideo, ListRecordsResponse};

/// Table names routinely contain spaces
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Where candidate videos come from and where verdicts are written back
pub trait RecordStore: Send + Sync {
    fn fetch_candidates(&self) -> Result<Vec<CandidateVideo>, RemoteError>;
    fn mark(&self, record_id: &str, field: &str, value: Value) -> Result<(), RemoteError>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn fetch_candidates(&self) -> Result<Vec<CandidateVideo>, RemoteError> {
        (**self).fetch_candidates()
    }

    fn mark(&self, record_id: &str, field: &str, value: Value) -> Result<(), RemoteError> {
        (**self).mark(record_id, field, value)
    }
}

pub struct AirtableClient {
    client: Client,
    api_key: String,
    table_url: String,
    view: Option<String>,
    url_field: String,
}

impl AirtableClient {
    pub fn new(config: &AirtableConfig) -> Result<Self, RemoteError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(RemoteError::MissingField("airtable.api_key"))?;
        let base_id = config
            .base_id
            .as_deref()
            .ok_or(RemoteError::MissingField("airtable.base_id"))?;
        let table = config
            .table
            .as_deref()
            .ok_or(RemoteError::MissingField("airtable.table"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            table_url: table_url(&config.api_base, base_id, table),
            view: config.view.clone(),
            url_field: config.url_field.clone(),
        })
    }

    fn fetch_page(&self, offset: Option<&str>) -> Result<ListRecordsResponse, RemoteError> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(view) = self.view.as_deref() {
            query.push(("view", view));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset));
        }

        let response = self
            .client
            .get(&self.table_url)
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()?;

        Ok(check_status(response)?.json()?)
    }
}

impl RecordStore for AirtableClient {
    fn fetch_candidates(&self) -> Result<Vec<CandidateVideo>, RemoteError> {
        let records = collect_pages(|offset| self.fetch_page(offset))?;
        info!("📋 Fetched {} record(s) from Airtable", records.len());

        Ok(records
            .into_iter()
            .map(|r| r.into_candidate(&self.url_field))
            .collect())
    }

    fn mark(&self, record_id: &str, field: &str, value: Value) -> Result<(), RemoteError> {
        let response = self
            .client
            .patch(format!("{}/{}", self.table_url, record_id))
            .bearer_auth(&self.api_key)
            .json(&update_body(field, value))
            .send()?;
        check_status(response)?;

        debug!("✏️ Marked {} {:?}", record_id, field);
        Ok(())
    }
}

fn table_url(api_base: &str, base_id: &str, table: &str) -> String {
    format!(
        "{}/{}/{}",
        api_base.trim_end_matches('/'),
        base_id,
        utf8_percent_encode(table, PATH_SEGMENT)
    )
}

fn update_body(field: &str, value: Value) -> Value {
    json!({ "fields": { field: value } })
}

/// Follow `offset` until the last page
fn collect_pages<F>(mut fetch_page: F) -> Result<Vec<AirtableRecord>, RemoteError>
where
    F: FnMut(Option<&str>) -> Result<ListRecordsResponse, RemoteError>,
{
    let mut records = Vec::new();
    let mut offset: Option<String> = None;

    loop {
        let page = fetch_page(offset.as_deref())?;
        debug!("📄 Page with {} record(s)", page.records.len());
        records.extend(page.records);

        match page.offset {
            Some(next) => offset = Some(next),
            None => break,
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json: &str) -> ListRecordsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_table_url_encodes_name() {
        assert_eq!(
            table_url("https://api.airtable.com/v0/", "app123", "Video Queue"),
            "https://api.airtable.com/v0/app123/Video%20Queue"
        );
        assert_eq!(
            table_url("http://localhost:9000", "app1", "tbl_Videos"),
            "http://localhost:9000/app1/tbl_Videos"
        );
        assert_eq!(
            table_url("http://localhost:9000", "app1", "Videos/Q1 ?#"),
            "http://localhost:9000/app1/Videos%2FQ1%20%3F%23"
        );
        assert_eq!(
            table_url("http://localhost:9000", "app1", "Vidéos~v1.2"),
            "http://localhost:9000/app1/Vid%C3%A9os~v1.2"
        );
    }

    #[test]
    fn test_update_body() {
        assert_eq!(
            update_body("TOS DETECTED", Value::Bool(true)),
            json!({"fields": {"TOS DETECTED": true}})
        );
    }

    #[test]
    fn test_pagination_follows_offset() {
        let mut requested: Vec<Option<String>> = Vec::new();
        let records = collect_pages(|offset| {
            requested.push(offset.map(str::to_string));
            Ok(match offset {
                None => page(r#"{"records":[{"id":"rec1"},{"id":"rec2"}],"offset":"itr1"}"#),
                Some("itr1") => page(r#"{"records":[{"id":"rec3"}],"offset":"itr2"}"#),
                _ => page(r#"{"records":[]}"#),
            })
        })
        .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rec1", "rec2", "rec3"]);
        assert_eq!(
            requested,
            vec![None, Some("itr1".to_string()), Some("itr2".to_string())]
        );
    }

    #[test]
    fn test_pagination_error_propagates() {
        let result = collect_pages(|offset| match offset {
            None => Ok(page(r#"{"records":[{"id":"rec1"}],"offset":"next"}"#)),
            Some(_) => Err(RemoteError::Status {
                status: 422,
                body: "LIST_RECORDS_ITERATOR_NOT_AVAILABLE".into(),
            }),
        });
        assert!(matches!(result, Err(RemoteError::Status { status: 422, .. })));
    }

    #[test]
    fn test_client_requires_credentials() {
        let config = AirtableConfig::default();
        assert!(matches!(
            AirtableClient::new(&config),
            Err(RemoteError::MissingField("airtable.api_key"))
        ));

        let config = AirtableConfig {
            api_key: Some("key".into()),
            base_id: Some("app1".into()),
            table: Some("Videos".into()),
            ..AirtableConfig::default()
        };
        let client = AirtableClient::new(&config).unwrap();
        assert_eq!(client.table_url, "https://api.airtable.com/v0/app1/Videos");
    }
}
