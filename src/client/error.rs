//! Remote API errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum length of a raw (unstructured) error body kept in messages.
const RAW_BODY_LIMIT: usize = 200;

/// Errors returned by a [`RemoteApi`](super::RemoteApi) call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS or body transfer failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The platform answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not what the endpoint promises
    #[error("unexpected response: {0}")]
    Parse(String),
}

/// Result type alias for remote API calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build a status error from a response body.
    pub fn from_body(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            message: extract_error_message(body, status),
        }
    }
}

/// Human-readable message from an error body.
///
/// Structured bodies look like `{"errors": [{"message": "..."}]}`; anything
/// else is returned as raw text, trimmed and truncated. An empty body yields
/// the status's reason phrase.
pub fn extract_error_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("errors")
            .and_then(|errors| errors.get(0))
            .and_then(|first| first.get("message"))
            .and_then(|message| message.as_str())
        {
            return message.to_string();
        }
    }

    let raw = body.trim();
    if raw.is_empty() {
        return StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("empty response body")
            .to_string();
    }
    if raw.chars().count() > RAW_BODY_LIMIT {
        let truncated: String = raw.chars().take(RAW_BODY_LIMIT).collect();
        format!("{}...", truncated)
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_message() {
        let body = concat!(
            r#"{"errors":[{"message":"Field \"title\" already exists.","#,
            r#""extensions":{"code":"INVALID_PAYLOAD"}}]}"#
        );
        assert_eq!(
            extract_error_message(body, 400),
            "Field \"title\" already exists."
        );
    }

    #[test]
    fn test_json_without_errors_falls_back_to_raw() {
        let body = r#"{"detail":"nope"}"#;
        assert_eq!(extract_error_message(body, 400), body);
    }

    #[test]
    fn test_plain_text_body() {
        assert_eq!(extract_error_message("  Bad Gateway\n", 502), "Bad Gateway");
    }

    #[test]
    fn test_empty_body_uses_status_reason() {
        assert_eq!(extract_error_message("", 503), "Service Unavailable");
        assert_eq!(extract_error_message("  ", 599), "empty response body");
        assert_eq!(
            ApiError::from_body(400, "").to_string(),
            "HTTP 400: Bad Request"
        );
    }

    #[test]
    fn test_long_raw_body_truncated() {
        let body = "x".repeat(500);
        let message = extract_error_message(&body, 500);
        assert_eq!(message.len(), RAW_BODY_LIMIT + 3);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn test_status_error_display() {
        let err = ApiError::from_body(403, r#"{"errors":[{"message":"Forbidden"}]}"#);
        assert_eq!(err.to_string(), "HTTP 403: Forbidden");
    }
}
