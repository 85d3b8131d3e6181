pub mod health;
pub mod navigation;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::errors::NavError;

/// Maps the navigation error taxonomy onto HTTP statuses and structured JSON
/// bodies.
pub struct ApiError(pub NavError);

impl From<NavError> for ApiError {
    fn from(err: NavError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.0 {
            NavError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "store_unavailable",
                self.0.to_string(),
            ),
            NavError::Empty => (
                StatusCode::SERVICE_UNAVAILABLE,
                "store_empty",
                self.0.to_string(),
            ),
            NavError::NodeNotFound(_) => {
                (StatusCode::NOT_FOUND, "node_not_found", self.0.to_string())
            }
            NavError::ParentNotFound(_) => (
                StatusCode::NOT_FOUND,
                "parent_not_found",
                self.0.to_string(),
            ),
            NavError::DuplicateKey(_) => {
                (StatusCode::BAD_REQUEST, "duplicate_key", self.0.to_string())
            }
            NavError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request", self.0.to_string())
            }
            NavError::Database(err) => {
                error!("navigation database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "internal database error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}
