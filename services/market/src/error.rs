//! Error taxonomy for the marketplace service
//!
//! Repository and workflow functions fail fast with one of these typed
//! errors; the `IntoResponse` impl translates them to the corresponding
//! HTTP status with a `{"detail": ...}` body. No operation is retried.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Typed error for every handler, repository and workflow
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authorization header missing on a protected route
    #[error("Authorization header missing")]
    AuthMissing,

    /// Authorization header present but not `Bearer`
    #[error("Invalid authentication scheme")]
    AuthScheme,

    /// Token signature invalid, structurally malformed, or expired
    #[error("Token verification failed")]
    AuthInvalid,

    /// Token decoded but no account matches the email claim; the lookup
    /// doubles as the revocation check for deleted accounts.
    #[error("User not found")]
    AuthUserNotFound,

    /// Bad input shape or missing required filters
    #[error("{0}")]
    Validation(String),

    /// Domain rule violated (duplicate email, product already sold, ...)
    #[error("{0}")]
    BusinessRule(String),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// External payment provider rejected the request
    #[error("{0}")]
    Upstream(String),

    /// Anything unexpected; details are logged, never surfaced
    #[error("Internal server error")]
    Internal,
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // Constraint violations are business-rule failures carrying
            // the database message.
            sqlx::Error::Database(db) if db.constraint().is_some() => {
                ApiError::BusinessRule(db.message().to_string())
            }
            other => {
                tracing::error!("Database error: {other}");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::AuthMissing
            | ApiError::AuthScheme
            | ApiError::AuthInvalid
            | ApiError::AuthUserNotFound => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) | ApiError::BusinessRule(_) | ApiError::Upstream(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "detail": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for handler and repository results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_401() {
        for err in [
            ApiError::AuthMissing,
            ApiError::AuthScheme,
            ApiError::AuthInvalid,
            ApiError::AuthUserNotFound,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn business_errors_map_to_400() {
        let err = ApiError::BusinessRule("Email already registered".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = ApiError::Upstream("provider says no".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::NotFound("Product not found".to_string());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
