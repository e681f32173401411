use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use carton_core::carrier::{Address, CarrierGateway, CarrierTrackingEvent, ShippingLabel};
use carton_core::{FulfillError, FulfillResult};

use crate::invoice::InvoiceGenerator;
use crate::models::{
    CartItem, DeliveryConfirmation, NotificationChannel, NotificationEvent, Order, OrderItem,
    OrderStatus, PaymentStatus, TrackingEvent,
};
use crate::notifications::NotificationQueue;
use crate::repository::{DeliveryRepository, OrderRepository, TrackingRepository};

/// Owns the order state machine and orchestrates invoicing, tracking
/// ingestion, delivery confirmation and notifications.
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
    tracking: Arc<dyn TrackingRepository>,
    deliveries: Arc<dyn DeliveryRepository>,
    invoices: Arc<InvoiceGenerator>,
    notifications: NotificationQueue,
    carrier: Arc<dyn CarrierGateway>,
}

impl OrderManager {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        tracking: Arc<dyn TrackingRepository>,
        deliveries: Arc<dyn DeliveryRepository>,
        invoices: Arc<InvoiceGenerator>,
        notifications: NotificationQueue,
        carrier: Arc<dyn CarrierGateway>,
    ) -> Self {
        Self {
            orders,
            tracking,
            deliveries,
            invoices,
            notifications,
            carrier,
        }
    }

    /// Create an order from a checkout cart snapshot.
    ///
    /// Totals are computed from the snapshot prices, never re-read from a
    /// live catalog, so a price change mid-checkout cannot drift the total.
    pub async fn create_order(
        &self,
        user_id: &str,
        cart: &[CartItem],
        shipping_address: Address,
        delivery_option: Option<String>,
        payment_method: &str,
        currency: &str,
    ) -> FulfillResult<Order> {
        if cart.is_empty() {
            return Err(FulfillError::validation("cart snapshot is empty"));
        }
        for item in cart {
            if item.quantity < 1 {
                return Err(FulfillError::validation(format!(
                    "item {} has non-positive quantity",
                    item.product_id
                )));
            }
        }

        let id = Order::generate_id();
        let items: Vec<OrderItem> = cart
            .iter()
            .map(|c| OrderItem::from_cart_item(&id, c, currency))
            .collect();
        let total_cents = items.iter().map(|i| i.line_total_cents).sum();

        let now = Utc::now();
        let order = Order {
            id: id.clone(),
            user_id: user_id.to_string(),
            items,
            currency: currency.to_string(),
            total_cents,
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            shipping_address,
            delivery_option,
            payment_method: payment_method.to_string(),
            invoice_url: None,
            tracking_number: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };

        self.orders.create_order(&order).await?;
        tracing::info!(order_id = %order.id, user_id, total_cents, "order created");

        self.notifications
            .enqueue_best_effort(
                &order.id,
                user_id,
                NotificationEvent::OrderConfirmation,
                NotificationChannel::Email,
            )
            .await;

        Ok(order)
    }

    /// Confirm payment for an order, idempotently on the payment reference.
    ///
    /// The first confirmation moves the order to `ReadyToShip`, generates
    /// the invoice and queues a `payment_confirmed` notification; repeats
    /// with the same reference return the order untouched.
    pub async fn confirm_payment(
        &self,
        order_id: &str,
        payment_reference: &str,
    ) -> FulfillResult<Order> {
        let order = self.require_order(order_id).await?;

        if order.payment_status == PaymentStatus::Completed {
            if order.payment_reference.as_deref() != Some(payment_reference) {
                tracing::warn!(
                    order_id,
                    payment_reference,
                    "payment already completed under a different reference"
                );
            }
            // A payment recorded without its invoice means an earlier run
            // died between the two writes; regenerate before returning.
            if order.invoice_url.is_none() {
                self.invoices.generate(order_id).await?;
                return self.require_order(order_id).await;
            }
            return Ok(order);
        }

        // Invoice first: if rendering or upload fails, the payment fields
        // are untouched and the retry runs the whole confirmation again.
        self.invoices.generate(order_id).await?;

        self.orders
            .set_payment(order_id, PaymentStatus::Completed, payment_reference)
            .await?;
        self.orders
            .advance_status(order_id, OrderStatus::ReadyToShip)
            .await?;
        tracing::info!(order_id, payment_reference, "payment confirmed");

        self.notifications
            .enqueue_best_effort(
                order_id,
                &order.user_id,
                NotificationEvent::PaymentConfirmed,
                NotificationChannel::Email,
            )
            .await;

        self.require_order(order_id).await
    }

    /// Ingest a carrier tracking event.
    ///
    /// History is appended unconditionally, before and independently of the
    /// status update; duplicate and out-of-order carrier pings are kept.
    /// The status only ever moves forward; a terminal `delivered` event
    /// additionally creates the delivery confirmation (once) and stamps the
    /// delivered timestamp.
    pub async fn ingest_tracking_event(
        &self,
        order_id: &str,
        event: CarrierTrackingEvent,
    ) -> FulfillResult<Order> {
        let order = self.require_order(order_id).await?;

        let row = TrackingEvent {
            id: Uuid::new_v4(),
            order_id: order_id.to_string(),
            tracking_number: event.tracking_number.clone(),
            status_code: event.status_code.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            carrier: event.carrier.clone(),
            occurred_at: event.occurred_at,
            raw: event.raw.clone(),
        };
        self.tracking.append_event(&row).await?;

        let mapped = OrderStatus::from_carrier_code(&event.status_code);
        let advanced = self.orders.advance_status(order_id, mapped).await?;
        if advanced {
            tracing::info!(order_id, status = ?mapped, code = %event.status_code, "order status advanced");
            if let Some(notification) = NotificationEvent::for_status(mapped) {
                self.notifications
                    .enqueue_best_effort(
                        order_id,
                        &order.user_id,
                        notification,
                        NotificationChannel::Email,
                    )
                    .await;
            }
        }

        if mapped == OrderStatus::Delivered {
            self.record_delivery(&order, &event).await?;
        }

        self.require_order(order_id).await
    }

    /// Administrative status override: any forward or lateral transition,
    /// no carrier evidence required.
    pub async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> FulfillResult<Order> {
        let order = self.require_order(order_id).await?;
        // Overrides may jump ahead or re-assert the current status, but
        // never rewind the lifecycle.
        if status.rank() < order.status.rank() {
            return Err(FulfillError::validation(format!(
                "cannot move order {order_id} backward from {:?} to {status:?}",
                order.status
            )));
        }
        self.orders.set_status(order_id, status).await?;
        tracing::info!(order_id, status = ?status, "order status overridden");

        if let Some(notification) = NotificationEvent::for_status(status) {
            self.notifications
                .enqueue_best_effort(
                    order_id,
                    &order.user_id,
                    notification,
                    NotificationChannel::Email,
                )
                .await;
        }

        self.require_order(order_id).await
    }

    /// Purchase a label for a created shipment and store the tracking
    /// number on the order.
    pub async fn purchase_label(
        &self,
        order_id: &str,
        shipment_id: &str,
        rate_id: &str,
    ) -> FulfillResult<ShippingLabel> {
        self.require_order(order_id).await?;
        let label = self.carrier.buy_label(shipment_id, rate_id).await?;
        self.orders
            .set_tracking_number(order_id, &label.tracking_number)
            .await?;
        tracing::info!(order_id, tracking_number = %label.tracking_number, "label purchased");
        Ok(label)
    }

    pub async fn get_order(&self, order_id: &str) -> FulfillResult<Order> {
        self.require_order(order_id).await
    }

    pub async fn list_orders(&self, user_id: &str) -> FulfillResult<Vec<Order>> {
        self.orders.list_orders(user_id).await
    }

    /// Tracking history for an order, ordered by carrier occurrence time.
    pub async fn tracking_history(&self, order_id: &str) -> FulfillResult<Vec<TrackingEvent>> {
        self.require_order(order_id).await?;
        self.tracking.events_for_order(order_id).await
    }

    pub async fn delivery_confirmation(
        &self,
        order_id: &str,
    ) -> FulfillResult<Option<DeliveryConfirmation>> {
        self.deliveries.get(order_id).await
    }

    async fn record_delivery(
        &self,
        order: &Order,
        event: &CarrierTrackingEvent,
    ) -> FulfillResult<()> {
        let confirmation = DeliveryConfirmation {
            order_id: order.id.clone(),
            delivered_at: event.occurred_at,
            signature_url: raw_string(&event.raw, "signature_url"),
            photo_url: raw_string(&event.raw, "photo_url"),
            recipient_name: raw_string(&event.raw, "recipient_name")
                .or_else(|| Some(order.shipping_address.name.clone())),
            notes: raw_string(&event.raw, "notes"),
        };

        let created = self.deliveries.create_if_absent(&confirmation).await?;
        if created {
            self.orders
                .set_delivered_at(&order.id, event.occurred_at)
                .await?;
            tracing::info!(order_id = %order.id, "delivery confirmed");
        }
        Ok(())
    }

    async fn require_order(&self, order_id: &str) -> FulfillResult<Order> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| FulfillError::not_found(format!("order {order_id}")))
    }
}

fn raw_string(raw: &serde_json::Value, key: &str) -> Option<String> {
    raw.get(key).and_then(|v| v.as_str()).map(str::to_string)
}
