use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Response missing field: {0}")]
    MissingField(&'static str),
}

/// Pass through success responses, turn anything else into [`RemoteError::Status`]
pub(crate) fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}
