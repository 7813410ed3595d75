//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::auth::AuthFailure;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Missing, invalid or unverifiable API keys
/// - **Throttling**: The API key exhausted its rate window
/// - **Resource Errors**: Requested resources not found
/// - **Business Logic Errors**: Operations that violate business rules
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The request could not be authenticated.
    ///
    /// Returns HTTP 401 Unauthorized. The response never says why.
    #[error("Unauthorized")]
    Unauthorized,

    /// Returns HTTP 429 Too Many Requests with a `Retry-After` header.
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    /// Requested proposal does not exist or belongs to another API key.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Proposal not found")]
    ProposalNotFound,

    /// The proposal is not in a state that allows the operation.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    InvalidState(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Collapse guard rejections into what the client is allowed to see.
///
/// Missing, invalid and unverifiable keys all become the same 401 so the
/// response does not reveal which digests exist.
impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::RateLimited { retry_after_secs } => {
                AppError::RateLimited { retry_after_secs }
            }
            AuthFailure::MissingCredential
            | AuthFailure::InvalidCredential
            | AuthFailure::UpstreamLookupFailure(_) => AppError::Unauthorized,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Unauthorized` → 401 Unauthorized
/// - `RateLimited` → 429 Too Many Requests
/// - `ProposalNotFound` → 404 Not Found
/// - `InvalidState` → 409 Conflict
/// - `InvalidRequest` → 400 Bad Request
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = match self {
            AppError::RateLimited { retry_after_secs } => Some(retry_after_secs),
            _ => None,
        };

        let (status, code, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                self.to_string(),
            ),
            AppError::ProposalNotFound => (
                StatusCode::NOT_FOUND,
                "proposal_not_found",
                self.to_string(),
            ),
            AppError::InvalidState(ref msg) => (StatusCode::CONFLICT, "invalid_state", msg.clone()),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_collapse_to_unauthorized() {
        for failure in [
            AuthFailure::MissingCredential,
            AuthFailure::InvalidCredential,
            AuthFailure::UpstreamLookupFailure("timeout".into()),
        ] {
            let response = AppError::from(failure).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AppError::from(AuthFailure::RateLimited {
            retry_after_secs: 30,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "30");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::ProposalNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidState("nope".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InvalidRequest("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
