use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use carton_core::blob::BlobStore;
use carton_core::{FulfillError, FulfillResult};
use carton_order::models::{
    DeliveryConfirmation, Invoice, Notification, NotificationStatus, Order, OrderStatus,
    PaymentStatus, TrackingEvent,
};
use carton_order::repository::{
    DeliveryRepository, InvoiceRepository, NotificationRepository, OrderRepository,
    TrackingRepository,
};
use carton_shipping::rates::{RateQuoteRepository, ShippingRateQuote};

/// In-memory implementation of every storage trait, one logical table per
/// field. The reference store and the test double in one: persistence is an
/// abstract document store to the rest of the system, and status updates
/// here are serialized by the orders write lock, which is the
/// compare-and-advance the order state machine relies on.
pub struct MemoryStore {
    orders: RwLock<HashMap<String, Order>>,
    invoices: RwLock<HashMap<String, Invoice>>,
    tracking_events: RwLock<Vec<TrackingEvent>>,
    deliveries: RwLock<HashMap<String, DeliveryConfirmation>>,
    quotes: RwLock<Vec<ShippingRateQuote>>,
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            invoices: RwLock::new(HashMap::new()),
            tracking_events: RwLock::new(Vec::new()),
            deliveries: RwLock::new(HashMap::new()),
            quotes: RwLock::new(Vec::new()),
            notifications: RwLock::new(Vec::new()),
        }
    }

    /// All notification rows, for assertions and diagnostics.
    pub async fn all_notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    /// Raw tracking row count for an order (insertion order, unsorted).
    pub async fn tracking_row_count(&self, order_id: &str) -> usize {
        self.tracking_events
            .read()
            .await
            .iter()
            .filter(|e| e.order_id == order_id)
            .count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown_order(id: &str) -> FulfillError {
    FulfillError::not_found(format!("order {id}"))
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order(&self, order: &Order) -> FulfillResult<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(FulfillError::storage(format!(
                "order id collision: {}",
                order.id
            )));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self, id: &str) -> FulfillResult<Option<Order>> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn list_orders(&self, user_id: &str) -> FulfillResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn set_payment(
        &self,
        id: &str,
        status: PaymentStatus,
        reference: &str,
    ) -> FulfillResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| unknown_order(id))?;
        order.payment_status = status;
        order.payment_reference = Some(reference.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn advance_status(&self, id: &str, status: OrderStatus) -> FulfillResult<bool> {
        // Check and write under one write lock: concurrent ingestions
        // cannot lose an update or move the status backwards.
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| unknown_order(id))?;
        if status.rank() > order.status.rank() {
            order.status = status;
            order.updated_at = Utc::now();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn set_status(&self, id: &str, status: OrderStatus) -> FulfillResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| unknown_order(id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_invoice_url(&self, id: &str, url: &str) -> FulfillResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| unknown_order(id))?;
        order.invoice_url = Some(url.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_tracking_number(&self, id: &str, tracking_number: &str) -> FulfillResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| unknown_order(id))?;
        order.tracking_number = Some(tracking_number.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_delivered_at(&self, id: &str, at: DateTime<Utc>) -> FulfillResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| unknown_order(id))?;
        order.delivered_at = Some(at);
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl TrackingRepository for MemoryStore {
    async fn append_event(&self, event: &TrackingEvent) -> FulfillResult<()> {
        self.tracking_events.write().await.push(event.clone());
        Ok(())
    }

    async fn events_for_order(&self, order_id: &str) -> FulfillResult<Vec<TrackingEvent>> {
        let mut events: Vec<TrackingEvent> = self
            .tracking_events
            .read()
            .await
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.occurred_at);
        Ok(events)
    }
}

#[async_trait]
impl DeliveryRepository for MemoryStore {
    async fn create_if_absent(&self, confirmation: &DeliveryConfirmation) -> FulfillResult<bool> {
        let mut deliveries = self.deliveries.write().await;
        if deliveries.contains_key(&confirmation.order_id) {
            return Ok(false);
        }
        deliveries.insert(confirmation.order_id.clone(), confirmation.clone());
        Ok(true)
    }

    async fn get(&self, order_id: &str) -> FulfillResult<Option<DeliveryConfirmation>> {
        Ok(self.deliveries.read().await.get(order_id).cloned())
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn upsert(&self, invoice: &Invoice) -> FulfillResult<()> {
        self.invoices
            .write()
            .await
            .insert(invoice.number.clone(), invoice.clone());
        Ok(())
    }

    async fn get(&self, number: &str) -> FulfillResult<Option<Invoice>> {
        Ok(self.invoices.read().await.get(number).cloned())
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn enqueue(&self, notification: &Notification) -> FulfillResult<()> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn list_pending(&self) -> FulfillResult<Vec<Notification>> {
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.status == NotificationStatus::Pending)
            .cloned()
            .collect())
    }

    async fn mark_dispatched(&self, id: Uuid) -> FulfillResult<()> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| FulfillError::not_found(format!("notification {id}")))?;
        notification.status = NotificationStatus::Dispatched;
        Ok(())
    }
}

#[async_trait]
impl RateQuoteRepository for MemoryStore {
    async fn find_unexpired(
        &self,
        dest_postal_code: &str,
        weight_grams: u32,
        now: DateTime<Utc>,
    ) -> FulfillResult<Vec<ShippingRateQuote>> {
        Ok(self
            .quotes
            .read()
            .await
            .iter()
            .filter(|q| {
                q.dest_postal_code == dest_postal_code
                    && q.weight_grams == weight_grams
                    && !q.is_expired(now)
            })
            .cloned()
            .collect())
    }

    async fn insert_quotes(&self, quotes: &[ShippingRateQuote]) -> FulfillResult<()> {
        self.quotes.write().await.extend_from_slice(quotes);
        Ok(())
    }
}

/// In-memory blob storage: path -> bytes, URLs under a configured base.
pub struct MemoryBlobStore {
    public_base_url: String,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> FulfillResult<String> {
        self.blobs.write().await.insert(path.to_string(), bytes);
        Ok(format!("{}/{}", self.public_base_url, path))
    }

    async fn get(&self, path: &str) -> FulfillResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(path).cloned())
    }
}
