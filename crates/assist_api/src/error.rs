use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} {message}")]
    Status { status: StatusCode, message: String },

    #[error("expected an event stream but got '{content_type}': {message}")]
    NotAStream {
        content_type: String,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("request was cancelled")]
    Cancelled,

    #[error("{0}")]
    Unknown(String),
}

impl AssistApiError {
    /// Message the server supplied in its failure body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::NotAStream { message, .. } => {
                Some(message.as_str()).filter(|message| !message.trim().is_empty())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        let explicit = self.message.filter(|value| !value.trim().is_empty());
        if explicit.is_some() {
            return explicit;
        }

        match self.error? {
            Value::String(message) if !message.trim().is_empty() => Some(message),
            Value::Object(fields) => fields
                .get("message")
                .and_then(Value::as_str)
                .filter(|value| !value.trim().is_empty())
                .map(ToString::to_string),
            _ => None,
        }
    }
}

/// Longest plain-text body surfaced to the user as-is.
const MAX_PLAIN_MESSAGE_CHARS: usize = 200;

/// Message the server put in a non-stream body, if any.
///
/// Reads `{"message": ..}` or `{"error": ..}`. A short single-line plain-text
/// body counts too; markup such as a proxy error page does not.
pub fn body_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message() {
            return Some(message);
        }
    }

    let body = body.trim();
    let is_plain = !body.is_empty()
        && !body.starts_with('<')
        && !body.starts_with('{')
        && !body.contains('\n')
        && body.chars().count() <= MAX_PLAIN_MESSAGE_CHARS;

    is_plain.then(|| body.to_string())
}

/// Extract a user-facing message from a failed (non-stream) response body.
///
/// Falls back to the canonical status reason when the body carries no
/// readable message.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    body_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    })
}
