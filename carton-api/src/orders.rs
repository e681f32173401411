use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use carton_core::carrier::Address;
use carton_order::models::{CartItem, Order, OrderStatus, TrackingEvent};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub items: Vec<CartItem>,
    pub shipping_address: Address,
    pub delivery_option: Option<String>,
    pub payment_method: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: Order,
    pub tracking_history: Vec<TrackingEvent>,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", post(create_order).get(list_orders))
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/orders/{id}/status", post(update_status))
}

/// POST /v1/orders — checkout: create an order from a cart snapshot.
async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = state
        .manager
        .create_order(
            &payload.user_id,
            &payload.items,
            payload.shipping_address,
            payload.delivery_option,
            &payload.payment_method,
            &payload.currency,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /v1/orders/{id} — order with its time-ordered tracking history.
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailResponse>, AppError> {
    let order = state.manager.get_order(&id).await?;
    let tracking_history = state.manager.tracking_history(&id).await?;
    Ok(Json(OrderDetailResponse {
        order,
        tracking_history,
    }))
}

/// GET /v1/orders?user_id= — a user's orders, newest first.
async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.manager.list_orders(&params.user_id).await?;
    Ok(Json(orders))
}

/// POST /v1/orders/{id}/status — administrative status override.
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state.manager.update_order_status(&id, payload.status).await?;
    Ok(Json(order))
}
