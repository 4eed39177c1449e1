use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{password::PasswordError, repository::RepositoryError, token::TokenError};

/// AppError
///
/// The closed set of failures an operation can report to the HTTP boundary.
/// Every failure is classified where it is detected and travels as a typed
/// `Result` until `IntoResponse` turns it into a status code and JSON body.
#[derive(Debug, Error)]
pub enum AppError {
    /// No bearer credential on the request, or the header is not `Bearer <token>`.
    #[error("Access denied. No token provided.")]
    Unauthenticated,
    /// Signature checks out but the token is past its expiry.
    #[error("Token expired")]
    ExpiredToken,
    /// Bad signature, wrong token kind or a garbled payload.
    #[error("Invalid token")]
    InvalidToken,
    /// Login with a password that does not match the stored digest.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Authenticated, but not entitled to touch the resource.
    #[error("Access denied")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    /// Storage, hashing or signing failure. The message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorResponse
///
/// The JSON body of every error response: `{"error": "..."}`.
#[derive(Debug, Serialize, serde::Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // A missing credential is a 403, a bad or stale one is a 401.
            AppError::Unauthenticated => StatusCode::FORBIDDEN,
            AppError::ExpiredToken | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(cause) = &self {
            tracing::error!(%cause, "request failed with internal error");
        }
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::ExpiredToken,
            TokenError::Invalid => AppError::InvalidToken,
            TokenError::Signing(cause) => AppError::Internal(cause),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(what) => AppError::Conflict(format!("{what} already exists")),
            RepositoryError::MissingReference(what) => AppError::NotFound(what),
            other => AppError::Internal(other.to_string()),
        }
    }
}

// Malformed bodies and path ids are client errors reported in the usual
// `{"error": ...}` shape instead of axum's plain-text rejections.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_bad_credentials_map_to_different_statuses() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn taxonomy_status_mapping() {
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("Post").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict("User already exists".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::validation("Content is required").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_cause_is_not_exposed() {
        let err = AppError::Internal("connection refused at 10.0.0.3".into());
        assert_eq!(err.public_message(), "Server error");
        assert_eq!(AppError::NotFound("Comment").public_message(), "Comment not found");
    }

    #[test]
    fn duplicate_key_becomes_conflict() {
        let err: AppError = RepositoryError::Duplicate("User").into();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "User already exists"));
    }

    #[test]
    fn missing_reference_becomes_not_found() {
        let err: AppError = RepositoryError::MissingReference("Post").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Post not found");
    }

    #[test]
    fn token_errors_keep_their_kind() {
        assert!(matches!(AppError::from(TokenError::Expired), AppError::ExpiredToken));
        assert!(matches!(AppError::from(TokenError::Invalid), AppError::InvalidToken));
    }
}
