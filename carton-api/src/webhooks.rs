use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use carton_core::carrier::CarrierTrackingEvent;
use carton_order::models::Order;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub order_id: String,
    pub payment_reference: String,
    pub status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/webhooks/payments", post(handle_payment_webhook))
        .route("/v1/webhooks/tracking/{order_id}", post(handle_tracking_webhook))
}

/// POST /v1/webhooks/payments — payment processor callback.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<StatusCode, AppError> {
    tracing::info!(
        order_id = %payload.order_id,
        status = %payload.status,
        "received payment webhook"
    );

    if payload.status == "succeeded" {
        state
            .manager
            .confirm_payment(&payload.order_id, &payload.payment_reference)
            .await?;
    } else {
        tracing::info!(
            order_id = %payload.order_id,
            "ignoring non-success payment event"
        );
    }

    Ok(StatusCode::OK)
}

/// POST /v1/webhooks/tracking/{order_id} — carrier tracking event.
async fn handle_tracking_webhook(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(event): Json<CarrierTrackingEvent>,
) -> Result<Json<Order>, AppError> {
    let order = state.manager.ingest_tracking_event(&order_id, event).await?;
    Ok(Json(order))
}
