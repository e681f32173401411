use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use carton_core::FulfillError;

/// HTTP boundary for the fulfillment error taxonomy.
#[derive(Debug)]
pub struct AppError(pub FulfillError);

impl From<FulfillError> for AppError {
    fn from(err: FulfillError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self.0 {
            FulfillError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            FulfillError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            FulfillError::Carrier { .. } => {
                tracing::error!("Carrier failure: {}", self.0);
                (StatusCode::BAD_GATEWAY, self.0.to_string())
            }
            FulfillError::Timeout(msg) => {
                tracing::error!("Upstream timeout: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, msg.clone())
            }
            FulfillError::Storage(msg) => {
                tracing::error!("Storage failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
