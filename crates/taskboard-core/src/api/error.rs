use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Failure of a call to the Task Store backend.
///
/// Status variants carry the `message` field of the backend's JSON error
/// body when there was one, so callers can show it or fall back to their
/// own text.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Token missing, expired or invalid. For authenticated calls the
    /// session has already been torn down when this is returned.
    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    /// A sign-in or sign-up endpoint refused the submitted credentials
    #[error("Invalid credentials: {}", detail(.0))]
    InvalidCredentials(Option<String>),

    #[error("Access denied: {}", detail(.0))]
    AccessDenied(Option<String>),

    #[error("Resource not found: {}", detail(.0))]
    NotFound(Option<String>),

    #[error("Bad request: {}", detail(.0))]
    BadRequest(Option<String>),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {}", detail(.0))]
    ServerError(Option<String>),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn detail(message: &Option<String>) -> &str {
    message.as_deref().unwrap_or("no details")
}

/// Maximum length for error response bodies in log messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The `message` field of a JSON error body, if present and non-empty
    fn extract_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        debug!(status = status.as_u16(), body = %Self::truncate_body(body), "Error response");
        let message = Self::extract_message(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            400 | 409 | 422 => ApiError::BadRequest(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                message.unwrap_or_else(|| Self::truncate_body(body))
            )),
        }
    }

    /// Like `from_status`, for endpoints that take credentials instead of a
    /// token: a `401` there means the credentials were wrong.
    pub fn from_auth_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ApiError::InvalidCredentials(Self::extract_message(body));
        }
        Self::from_status(status, body)
    }

    /// Message supplied by the backend, for showing to the user
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::InvalidCredentials(m)
            | ApiError::AccessDenied(m)
            | ApiError::NotFound(m)
            | ApiError::BadRequest(m)
            | ApiError::ServerError(m) => m.as_deref(),
            _ => None,
        }
    }

    /// Backend message, or `fallback` when it gave none
    pub fn user_message(&self, fallback: &str) -> String {
        self.backend_message().unwrap_or(fallback).to_string()
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(None)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(None)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, "short and stout"),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_backend_message_extracted() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"message":"User already exists"}"#,
        );
        assert_eq!(err.backend_message(), Some("User already exists"));
        assert_eq!(err.user_message("Sign up failed"), "User already exists");
        assert_eq!(err.to_string(), "Bad request: User already exists");
    }

    #[test]
    fn test_auth_status_keeps_message() {
        let err = ApiError::from_auth_status(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid credentials"}"#,
        );
        assert!(!err.is_unauthorized());
        assert_eq!(err.backend_message(), Some("Invalid credentials"));
        assert!(matches!(
            ApiError::from_auth_status(StatusCode::BAD_REQUEST, ""),
            ApiError::BadRequest(None)
        ));
    }

    #[test]
    fn test_non_json_body_falls_back() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>");
        assert_eq!(err.backend_message(), None);
        assert_eq!(err.user_message("Operation failed"), "Operation failed");

        let blank = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"message":"  "}"#);
        assert_eq!(blank.backend_message(), None);
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated, 510 total bytes"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
