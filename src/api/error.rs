//! Errors surfaced by the backend client.

use reqwest::StatusCode;

/// Failure of a backend call.
///
/// `Display` yields the message the UI shows verbatim: the response body
/// when the backend sent one, otherwise a generic status line.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("request failed: {details}")]
    Transport { details: String },
    #[error("unable to decode response: {details}")]
    Decode { details: String },
    #[error("invalid document id: {id:?}")]
    InvalidId { id: String },
}

impl ApiError {
    /// Build a status error from a non-2xx body, falling back to
    /// `"{fallback} {status}"` when the body is empty.
    pub fn from_status(status: StatusCode, body: String, fallback: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("{} {}", fallback, status.as_u16())
        } else {
            body
        };

        ApiError::Status { status, message }
    }

    /// HTTP status of the failed call, if the backend answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode {
                details: err.to_string(),
            }
        } else if err.is_timeout() {
            ApiError::Transport {
                details: "request timed out".to_string(),
            }
        } else if err.is_connect() {
            ApiError::Transport {
                details: "cannot connect to the Apex backend".to_string(),
            }
        } else {
            ApiError::Transport {
                details: err.to_string(),
            }
        }
    }
}
