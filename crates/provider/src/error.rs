use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;

/// Reasons an OAuth-signed launch is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Unknown consumer key: {0}")]
    UnknownConsumer(String),
    #[error("Missing OAuth parameter: {0}")]
    MissingOAuthParameter(&'static str),
    #[error("Unsupported signature method: {0}")]
    UnsupportedMethod(String),
    #[error("Unsupported OAuth version: {0}")]
    UnsupportedVersion(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Timestamp {timestamp} outside of the {threshold}s window")]
    StaleTimestamp { timestamp: i64, threshold: i64 },
    #[error("Invalid launch URL: {0}")]
    InvalidUrl(String),
    #[error("Signature mismatch")]
    Mismatch,
}

#[derive(Debug, Error)]
pub enum LtiError {
    #[error("Missing launch parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid {field}: {reason}")]
    InvalidFormat { field: &'static str, reason: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("Session expired or unavailable")]
    NotInSession,
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("Launch role does not satisfy '{0}'")]
    RoleMismatch(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl LtiError {
    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LtiError::MissingParameter(_) | LtiError::InvalidFormat { .. } => "bad_request",
            LtiError::NotFound(_) => "not_found",
            LtiError::NotInSession => "not_in_session",
            LtiError::Signature(_) => "invalid_signature",
            LtiError::RoleMismatch(_) => "forbidden",
            LtiError::Config(_) | LtiError::Database(_) => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LtiError::MissingParameter(_) | LtiError::InvalidFormat { .. } => {
                StatusCode::BAD_REQUEST
            }
            LtiError::NotFound(_) => StatusCode::NOT_FOUND,
            LtiError::NotInSession | LtiError::Signature(_) => StatusCode::UNAUTHORIZED,
            LtiError::RoleMismatch(_) => StatusCode::FORBIDDEN,
            LtiError::Config(_) | LtiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LtiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the logs.
        let description = if status.is_server_error() {
            tracing::error!(error = %self, "LTI request failed");
            None
        } else {
            Some(self.to_string())
        };
        (
            status,
            Json(json!({
                "error": self.code(),
                "error_description": description,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lti_error_status_codes() {
        let cases = [
            (LtiError::MissingParameter("user_id"), StatusCode::BAD_REQUEST),
            (
                LtiError::InvalidFormat {
                    field: "custom_course_context",
                    reason: "bad".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (LtiError::NotFound("course context".into()), StatusCode::NOT_FOUND),
            (LtiError::NotInSession, StatusCode::UNAUTHORIZED),
            (SignatureError::Mismatch.into(), StatusCode::UNAUTHORIZED),
            (LtiError::RoleMismatch("staff".into()), StatusCode::FORBIDDEN),
            (
                ConfigError::Validation("x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_signature_error_is_surfaced_unchanged() {
        let err: LtiError = SignatureError::UnknownConsumer("abc".into()).into();
        assert_eq!(err.to_string(), "Unknown consumer key: abc");
        assert!(matches!(
            err,
            LtiError::Signature(SignatureError::UnknownConsumer(ref k)) if k == "abc"
        ));
    }
}
