use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlogClientError {
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Token storage error: {0}")]
    TokenStorage(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String, BTreeMap<String, Vec<String>>),
    #[error("Server error ({0}): {1}")]
    Server(u16, String),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    details: Option<BTreeMap<String, Vec<String>>>,
}

impl BlogClientError {
    /// Maps a non-success response onto an error, keeping the server's
    /// message and any per-field validation details.
    pub async fn from_http_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        Self::from_status(status, &text)
    }

    fn from_status(status: u16, text: &str) -> Self {
        let body: ErrorBody = serde_json::from_str(text).unwrap_or_else(|_| ErrorBody {
            error: text.to_string(),
            details: None,
        });
        match status {
            400 => Self::InvalidRequest(body.error, body.details.unwrap_or_default()),
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound(body.error),
            409 => Self::Conflict(body.error),
            _ => Self::Server(status, body.error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_details_are_kept() {
        let err = BlogClientError::from_status(
            400,
            r#"{"error":"validation failed","details":{"name":["too long"]}}"#,
        );
        match err {
            BlogClientError::InvalidRequest(message, details) => {
                assert_eq!(message, "validation failed");
                assert_eq!(details["name"], vec!["too long".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plain_text_bodies_are_tolerated() {
        let err = BlogClientError::from_status(404, "gone");
        assert!(matches!(err, BlogClientError::NotFound(m) if m == "gone"));
    }

    #[test]
    fn unknown_statuses_become_server_errors() {
        let err = BlogClientError::from_status(502, "");
        assert!(matches!(err, BlogClientError::Server(502, _)));
    }
}
