use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use carton_core::carrier::{Address, ShippingLabel};
use carton_shipping::ShippingRateQuote;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub destination: Address,
    pub weight_grams: u32,
}

#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    pub shipment_id: String,
    pub rate_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/rates", post(quote_rates))
        .route("/v1/shipments/{order_id}/label", post(buy_label))
}

/// POST /v1/rates — cached carrier quotes for a destination and weight,
/// cheapest first.
async fn quote_rates(
    State(state): State<AppState>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<Vec<ShippingRateQuote>>, AppError> {
    let quotes = state
        .rate_cache
        .get_or_create(&payload.destination, payload.weight_grams)
        .await?;
    Ok(Json(quotes))
}

/// POST /v1/shipments/{order_id}/label — purchase a label for a created
/// shipment and store its tracking number on the order.
async fn buy_label(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(payload): Json<LabelRequest>,
) -> Result<Json<ShippingLabel>, AppError> {
    let label = state
        .manager
        .purchase_label(&order_id, &payload.shipment_id, &payload.rate_id)
        .await?;
    Ok(Json(label))
}
