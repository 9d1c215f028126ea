//! Error types
//!
//! Every failure of the console is an `ApiError`. Stores turn these into
//! notifications; only the binary ever bubbles them up.

use reqwest::StatusCode;
use serde_json::Value;

/// Generic message used when the server did not say anything useful
pub const GENERIC_ERROR: &str = "An error occurred";

/// Errors raised while talking to the backend
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({status})")]
    Status { status: StatusCode, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("No CSRF token in the server response")]
    MissingCsrf,

    #[error("Not connected")]
    NotConnected,

    #[error("Invalid data: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Message suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Http(e) if e.is_timeout() => "The server did not answer in time".to_string(),
            Self::Http(_) => "Unable to reach the server".to_string(),
            other => other.to_string(),
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// First string found in a JSON error payload.
///
/// Strings are returned as-is. Objects and arrays are walked depth-first
/// in the order the server sent the fields, so
/// `{"user": ["Bad Username or password"]}` yields the inner string.
pub fn first_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        Value::Array(items) => items.iter().find_map(first_string),
        Value::Object(map) => map.values().find_map(first_string),
        _ => None,
    }
}

/// Best-effort message from an error response body
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = first_string(&value) {
            return msg.to_string();
        }
    } else if !body.trim().is_empty() && body.len() <= 512 {
        // Plain text bodies are short messages; HTML error pages are not
        if !body.trim_start().starts_with('<') {
            return body.trim().to_string();
        }
    }

    status
        .canonical_reason()
        .map(|r| format!("{}: {}", GENERIC_ERROR, r))
        .unwrap_or_else(|| GENERIC_ERROR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_body() {
        let msg = extract_error_message(StatusCode::BAD_REQUEST, "\"Invalid mark\"");
        assert_eq!(msg, "Invalid mark");
    }

    #[test]
    fn test_nested_list_body() {
        let body = json!({"user": ["Bad Username or password"]}).to_string();
        let msg = extract_error_message(StatusCode::NOT_FOUND, &body);
        assert_eq!(msg, "Bad Username or password");
    }

    #[test]
    fn test_object_body() {
        let body = json!({"error": "Device not found"}).to_string();
        assert_eq!(
            extract_error_message(StatusCode::NOT_FOUND, &body),
            "Device not found"
        );
    }

    #[test]
    fn test_first_field_in_server_order() {
        let body = r#"{"username": ["A user with that username already exists."],
                       "email": ["Enter a valid email address."]}"#;
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, body),
            "A user with that username already exists."
        );
    }

    #[test]
    fn test_skips_non_strings() {
        let value = json!({"code": 12, "detail": {"mac": [null, "Invalid MAC"]}});
        assert_eq!(first_string(&value), Some("Invalid MAC"));
    }

    #[test]
    fn test_plain_text_body() {
        let msg = extract_error_message(StatusCode::FORBIDDEN, "CSRF Failed");
        assert_eq!(msg, "CSRF Failed");
    }

    #[test]
    fn test_generic_fallback() {
        let msg = extract_error_message(StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>");
        assert_eq!(msg, "An error occurred: Internal Server Error");

        let msg = extract_error_message(StatusCode::BAD_REQUEST, "{}");
        assert_eq!(msg, "An error occurred: Bad Request");
    }

    #[test]
    fn test_user_message_uses_server_text() {
        let err = ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid mark".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid mark");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }
}
