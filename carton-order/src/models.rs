use carton_core::carrier::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary fulfillment status of an order. Forward-only: transitions never
/// move to a lower rank except through the administrative override.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    ReadyToShip,
    Shipped,
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    /// Position in the lifecycle; used for the forward-only rule.
    pub fn rank(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Processing => 1,
            OrderStatus::ReadyToShip => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::OutForDelivery => 4,
            OrderStatus::Delivered => 5,
        }
    }

    /// Map a carrier-reported status code to an internal status.
    ///
    /// Unrecognized codes map to `Shipped` rather than being rejected;
    /// carriers evolve their vocabulary and the raw event is kept in
    /// history either way.
    pub fn from_carrier_code(code: &str) -> Self {
        match code {
            "pre_transit" => OrderStatus::ReadyToShip,
            "in_transit" => OrderStatus::Shipped,
            "out_for_delivery" => OrderStatus::OutForDelivery,
            "delivered" => OrderStatus::Delivered,
            _ => OrderStatus::Shipped,
        }
    }
}

/// Whether funds have been captured. Orthogonal to `OrderStatus`: it gates
/// `Processing -> ReadyToShip` but never moves the primary status itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// One line of a checkout cart snapshot. Prices are captured at checkout
/// time and never re-read from a live catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

/// An individual product line within an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: String,
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub currency: String,
}

impl OrderItem {
    pub fn from_cart_item(order_id: &str, item: &CartItem, currency: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order_id.to_string(),
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            line_total_cents: item.unit_price_cents * i64::from(item.quantity),
            currency: currency.to_string(),
        }
    }
}

/// The single source of truth for a customer's purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub currency: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub shipping_address: Address,
    pub delivery_option: Option<String>,
    pub payment_method: String,
    pub invoice_url: Option<String>,
    pub tracking_number: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Collision-resistant order identifier: unix millis plus a random
    /// suffix, safe across concurrent checkouts.
    pub fn generate_id() -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        format!("ORD-{}-{}", Utc::now().timestamp_millis(), suffix)
    }
}

/// One-to-one with an order once generated; invoice number equals the
/// order id, so re-generation upserts rather than duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    pub total_cents: i64,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
    pub document_url: String,
}

/// Append-only carrier history row. Read ordering is by `occurred_at`,
/// not insertion order; carrier events arrive out of sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub order_id: String,
    pub tracking_number: String,
    pub status_code: String,
    pub description: String,
    pub location: Option<String>,
    pub carrier: String,
    pub occurred_at: DateTime<Utc>,
    pub raw: serde_json::Value,
}

/// Created exactly once per order, by the first terminal delivery event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfirmation {
    pub order_id: String,
    pub delivered_at: DateTime<Utc>,
    pub signature_url: Option<String>,
    pub photo_url: Option<String>,
    pub recipient_name: Option<String>,
    pub notes: Option<String>,
}

/// Order lifecycle events that produce an outbound notification intent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    OrderConfirmation,
    PaymentConfirmed,
    OrderShipped,
    OutForDelivery,
    OrderDelivered,
}

impl NotificationEvent {
    /// Notification mapped to an order status, if any is defined.
    pub fn for_status(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Shipped => Some(NotificationEvent::OrderShipped),
            OrderStatus::OutForDelivery => Some(NotificationEvent::OutForDelivery),
            OrderStatus::Delivered => Some(NotificationEvent::OrderDelivered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    Email,
    Sms,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Dispatched,
}

/// Durable record of intent to notify; actual delivery is drained by an
/// external dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub order_id: String,
    pub user_id: String,
    pub event: NotificationEvent,
    pub channel: NotificationChannel,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        order_id: &str,
        user_id: &str,
        event: NotificationEvent,
        channel: NotificationChannel,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order_id.to_string(),
            user_id: user_id.to_string(),
            event,
            channel,
            status: NotificationStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
