/*
[INPUT]:  Error sources (validation, HTTP status, transport, serialization, local IO)
[OUTPUT]: Structured error types with retry and auth hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the casegen adapter
#[derive(Error, Debug)]
pub enum CasegenError {
    /// Client-side pre-flight check failed; no request was sent
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Server rejected the credential (401); the session has been signed out
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Server returned a non-success response
    #[error("Service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Local file access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CasegenError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            CasegenError::Network(_) => true,
            CasegenError::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(self, CasegenError::Unauthorized { .. })
    }

    /// Check if the server reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            CasegenError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            CasegenError::Service { status, .. } => Some(*status),
            CasegenError::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Create a service error from status code and message
    pub fn service_error(status: StatusCode, message: impl Into<String>) -> Self {
        CasegenError::Service {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CasegenError::Validation(message.into())
    }
}

/// Result type alias for casegen operations
pub type Result<T> = std::result::Result<T, CasegenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let server_err = CasegenError::service_error(StatusCode::BAD_GATEWAY, "upstream");
        assert!(server_err.is_retryable());

        let client_err = CasegenError::service_error(StatusCode::BAD_REQUEST, "bad");
        assert!(!client_err.is_retryable());

        let validation = CasegenError::validation("missing file");
        assert!(!validation.is_retryable());
    }

    #[test]
    fn test_error_is_auth_error() {
        let err = CasegenError::Unauthorized {
            message: "expired".to_string(),
        };
        assert!(err.is_auth_error());
        assert_eq!(err.status(), Some(401));
        assert!(!CasegenError::validation("x").is_auth_error());
    }

    #[test]
    fn test_service_error_creation() {
        let err = CasegenError::service_error(StatusCode::NOT_FOUND, "任务不存在");
        assert!(err.is_not_found());
        match err {
            CasegenError::Service { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "任务不存在");
            }
            _ => panic!("Expected Service error variant"),
        }
    }
}
