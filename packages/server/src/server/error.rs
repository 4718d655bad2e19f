//! HTTP mapping for the indexing failure taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::domains::indexing::IndexingError;

/// Wrapper that renders `IndexingError` as a JSON error response.
pub struct ApiError(pub IndexingError);

impl<E> From<E> for ApiError
where
    E: Into<IndexingError>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            IndexingError::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message }),
            ),
            IndexingError::EmptyBatch => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": "CSV is empty or invalid" }),
            ),
            IndexingError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": "User session not found" }),
            ),
            IndexingError::Unauthorized { host } => (
                StatusCode::FORBIDDEN,
                json!({
                    "success": false,
                    "message": format!("Domain not verified for this account: {}", host),
                    "host": host,
                }),
            ),
            IndexingError::InsufficientCredits {
                required,
                available,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                json!({
                    "success": false,
                    "message": "Insufficient credits",
                    "required": required,
                    "available": available,
                }),
            ),
            IndexingError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": "Job not found" }),
            ),
            IndexingError::CreditCeilingReached { balance } => (
                StatusCode::CONFLICT,
                json!({
                    "success": false,
                    "message": "Credit balance is already at the ceiling",
                    "credits": balance,
                }),
            ),
            IndexingError::IllegalTransition { from, to } => (
                StatusCode::CONFLICT,
                json!({
                    "success": false,
                    "message": format!("Illegal status transition: {} -> {}", from, to),
                }),
            ),
            // Infrastructure faults are logged with detail and surfaced
            // as a generic failure.
            IndexingError::DispatchFailed(e) => {
                error!(error = %e, "Dispatch failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "Failed to queue job" }),
                )
            }
            IndexingError::Database(e) => {
                error!(error = %e, "Database failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "Internal server error" }),
                )
            }
            IndexingError::Internal(e) => {
                error!(error = %e, "Internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
