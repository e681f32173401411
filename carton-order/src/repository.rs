use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use carton_core::FulfillResult;

use crate::models::{
    DeliveryConfirmation, Invoice, Notification, Order, OrderStatus, PaymentStatus, TrackingEvent,
};

/// Order persistence. Implementations must persist an order and its items
/// atomically on create, and serialize status-field updates (a
/// compare-and-advance) so concurrent tracking ingestion never loses one.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order together with its items. Fails on id collision.
    async fn create_order(&self, order: &Order) -> FulfillResult<()>;

    async fn get_order(&self, id: &str) -> FulfillResult<Option<Order>>;

    /// All orders for a user, newest first.
    async fn list_orders(&self, user_id: &str) -> FulfillResult<Vec<Order>>;

    /// Set payment status and reference. Fails with NotFound for unknown ids.
    async fn set_payment(
        &self,
        id: &str,
        status: PaymentStatus,
        reference: &str,
    ) -> FulfillResult<()>;

    /// Advance the primary status only if `status` ranks above the current
    /// one. Returns whether the update was applied. The check and the write
    /// happen under one serialization point.
    async fn advance_status(&self, id: &str, status: OrderStatus) -> FulfillResult<bool>;

    /// Raw status write backing the administrative override. Callers are
    /// responsible for rejecting lifecycle regressions before writing.
    async fn set_status(&self, id: &str, status: OrderStatus) -> FulfillResult<()>;

    async fn set_invoice_url(&self, id: &str, url: &str) -> FulfillResult<()>;

    async fn set_tracking_number(&self, id: &str, tracking_number: &str) -> FulfillResult<()>;

    async fn set_delivered_at(&self, id: &str, at: DateTime<Utc>) -> FulfillResult<()>;
}

/// Append-only tracking history.
#[async_trait]
pub trait TrackingRepository: Send + Sync {
    async fn append_event(&self, event: &TrackingEvent) -> FulfillResult<()>;

    /// Events for an order, ordered by carrier occurrence time.
    async fn events_for_order(&self, order_id: &str) -> FulfillResult<Vec<TrackingEvent>>;
}

/// Zero-or-one delivery confirmation per order.
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// Insert unless one already exists for the order. Returns whether a
    /// row was created.
    async fn create_if_absent(&self, confirmation: &DeliveryConfirmation) -> FulfillResult<bool>;

    async fn get(&self, order_id: &str) -> FulfillResult<Option<DeliveryConfirmation>>;
}

/// Invoices, keyed by invoice number (= order id). Upsert semantics.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn upsert(&self, invoice: &Invoice) -> FulfillResult<()>;

    async fn get(&self, number: &str) -> FulfillResult<Option<Invoice>>;
}

/// Durable queue of outbound notification intents.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn enqueue(&self, notification: &Notification) -> FulfillResult<()>;

    /// Pending records in enqueue order, for the external dispatcher.
    async fn list_pending(&self) -> FulfillResult<Vec<Notification>>;

    async fn mark_dispatched(&self, id: Uuid) -> FulfillResult<()>;
}
