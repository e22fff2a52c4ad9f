use reqwest::StatusCode;
use serde_json::Value;

/// Errors surfaced by the REST backend, grouped the way the UI reacts to them.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("SQL generation failed: {message}")]
    SqlGeneration { error_type: String, message: String },
    #[error("SQL execution failed: {message}")]
    SqlExecution { error_type: String, message: String },
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Builds an error from a non-success HTTP response body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = error_message(status, body);
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::BAD_REQUEST => ApiError::Validation(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            _ => ApiError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// True when the only sensible reaction is to send the user back to login.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Backend error code (`error_type`) carried by SQL errors, if any.
    pub fn error_type(&self) -> Option<&str> {
        match self {
            ApiError::SqlGeneration { error_type, .. } | ApiError::SqlExecution { error_type, .. } => {
                Some(error_type)
            }
            _ => None,
        }
    }

    /// The bare message without the category prefix, for storing on a query record.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Network(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Decode(msg) => msg.clone(),
            ApiError::SqlGeneration { message, .. }
            | ApiError::SqlExecution { message, .. }
            | ApiError::Server { message, .. } => message.clone(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Picks the most useful message out of an error body: `detail`, then `error`,
/// then `message`, falling back to the status line.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "error", "message"] {
            match map.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
    }
    format!(
        "{} - {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

/// Extracts `error_type` from an error body when the backend supplied one.
pub fn error_type(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error_type")?
        .as_str()
        .map(str::to_string)
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_detail_over_error() {
        let body = r#"{"detail":"Invalid credentials.","error":"other"}"#;
        assert_eq!(error_message(StatusCode::UNAUTHORIZED, body), "Invalid credentials.");
    }

    #[test]
    fn falls_back_to_error_then_message() {
        let body = r#"{"error":"Both query and database_id are required"}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "Both query and database_id are required"
        );
        let body = r#"{"success":false,"message":"type and id are required"}"#;
        assert_eq!(error_message(StatusCode::BAD_REQUEST, body), "type and id are required");
    }

    #[test]
    fn non_json_body_uses_status_line() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            "502 - Bad Gateway"
        );
    }

    #[test]
    fn classifies_by_status() {
        assert!(ApiError::from_response(StatusCode::UNAUTHORIZED, "{}").is_auth());
        assert!(matches!(
            ApiError::from_response(StatusCode::BAD_REQUEST, r#"{"detail":"x"}"#),
            ApiError::Validation(ref m) if m == "x"
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "{}"),
            ApiError::Server { status: 500, .. }
        ));
    }

    #[test]
    fn reads_error_type() {
        assert_eq!(
            error_type(r#"{"error":"x","error_type":"missing_parameters"}"#).as_deref(),
            Some("missing_parameters")
        );
        assert_eq!(error_type("not json"), None);
    }
}
