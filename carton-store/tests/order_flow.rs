//! End-to-end fulfillment flows over the real services and the in-memory
//! store: checkout, payment, invoicing, tracking ingestion and delivery
//! confirmation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use carton_core::blob::BlobStore;
use carton_core::carrier::{Address, CarrierGateway, OriginProfile};
use carton_core::{FulfillError, FulfillResult};
use carton_order::models::{CartItem, NotificationEvent, OrderStatus, PaymentStatus};
use carton_order::{InvoiceGenerator, NotificationQueue, OrderManager};
use carton_shipping::mock::{mock_tracking_event, MockCarrierGateway};
use carton_shipping::rates::RateCache;
use carton_store::{MemoryBlobStore, MemoryStore};

struct Fixture {
    store: Arc<MemoryStore>,
    blobs: Arc<MemoryBlobStore>,
    gateway: Arc<MockCarrierGateway>,
    manager: OrderManager,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::new("https://blobs.test"));
    let gateway = Arc::new(MockCarrierGateway::new());

    let invoices = Arc::new(InvoiceGenerator::new(
        store.clone(),
        store.clone(),
        blobs.clone(),
    ));
    let notifications = NotificationQueue::new(store.clone());
    let manager = OrderManager::new(
        store.clone(),
        store.clone(),
        store.clone(),
        invoices,
        notifications,
        gateway.clone(),
    );

    Fixture {
        store,
        blobs,
        gateway,
        manager,
    }
}

/// Blob store that can be switched into an outage for failure-path tests.
struct OutageBlobStore {
    inner: MemoryBlobStore,
    down: AtomicBool,
}

impl OutageBlobStore {
    fn new() -> Self {
        Self {
            inner: MemoryBlobStore::new("https://blobs.test"),
            down: AtomicBool::new(false),
        }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for OutageBlobStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> FulfillResult<String> {
        if self.down.load(Ordering::SeqCst) {
            return Err(FulfillError::storage("blob backend unavailable"));
        }
        self.inner.put(path, bytes, content_type).await
    }

    async fn get(&self, path: &str) -> FulfillResult<Option<Vec<u8>>> {
        self.inner.get(path).await
    }
}

fn fixture_with_blobs(blobs: Arc<dyn BlobStore>) -> (Arc<MemoryStore>, OrderManager) {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MockCarrierGateway::new());
    let invoices = Arc::new(InvoiceGenerator::new(store.clone(), store.clone(), blobs));
    let notifications = NotificationQueue::new(store.clone());
    let manager = OrderManager::new(
        store.clone(),
        store.clone(),
        store.clone(),
        invoices,
        notifications,
        gateway,
    );
    (store, manager)
}

fn address() -> Address {
    Address {
        name: "Grace Hopper".into(),
        street1: "12 Compiler Court".into(),
        street2: None,
        city: "Arlington".into(),
        region: "VA".into(),
        postal_code: "22202".into(),
        country: "US".into(),
        phone: Some("+1 555 0100".into()),
    }
}

fn sample_cart() -> Vec<CartItem> {
    vec![
        CartItem {
            product_id: "sku-1".into(),
            name: "Mug".into(),
            unit_price_cents: 5000,
            quantity: 2,
        },
        CartItem {
            product_id: "sku-2".into(),
            name: "Poster".into(),
            unit_price_cents: 3000,
            quantity: 1,
        },
    ]
}

async fn checkout(fx: &Fixture) -> String {
    fx.manager
        .create_order("user-1", &sample_cart(), address(), None, "card", "USD")
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_create_order_totals_from_snapshot() {
    let fx = fixture();
    let order = fx
        .manager
        .create_order("user-1", &sample_cart(), address(), None, "card", "USD")
        .await
        .unwrap();

    assert_eq!(order.total_cents, 13000);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].line_total_cents, 10000);

    let notifications = fx.store.all_notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].event, NotificationEvent::OrderConfirmation);
}

#[tokio::test]
async fn test_create_order_rejects_bad_carts() {
    let fx = fixture();

    let empty = fx
        .manager
        .create_order("user-1", &[], address(), None, "card", "USD")
        .await;
    assert!(matches!(empty, Err(FulfillError::Validation(_))));

    let zero_qty = vec![CartItem {
        product_id: "sku-1".into(),
        name: "Mug".into(),
        unit_price_cents: 5000,
        quantity: 0,
    }];
    let rejected = fx
        .manager
        .create_order("user-1", &zero_qty, address(), None, "card", "USD")
        .await;
    assert!(matches!(rejected, Err(FulfillError::Validation(_))));

    // Nothing was persisted and no notification was queued.
    assert!(fx.manager.list_orders("user-1").await.unwrap().is_empty());
    assert!(fx.store.all_notifications().await.is_empty());
}

#[tokio::test]
async fn test_confirm_payment_is_idempotent() {
    let fx = fixture();
    let order_id = checkout(&fx).await;

    let first = fx.manager.confirm_payment(&order_id, "pay_123").await.unwrap();
    assert_eq!(first.status, OrderStatus::ReadyToShip);
    assert_eq!(first.payment_status, PaymentStatus::Completed);
    assert!(first.invoice_url.is_some());

    let second = fx.manager.confirm_payment(&order_id, "pay_123").await.unwrap();
    assert_eq!(second.status, OrderStatus::ReadyToShip);

    // One invoice record, one payment_confirmed notification, one blob.
    use carton_order::repository::InvoiceRepository;
    let invoice = fx.store.get(&order_id).await.unwrap().unwrap();
    assert_eq!(invoice.total_cents, 13000);
    let confirmed = fx
        .store
        .all_notifications()
        .await
        .into_iter()
        .filter(|n| n.event == NotificationEvent::PaymentConfirmed)
        .count();
    assert_eq!(confirmed, 1);
    assert_eq!(fx.blobs.blob_count().await, 1);
}

#[tokio::test]
async fn test_confirm_payment_unknown_order() {
    let fx = fixture();
    let result = fx.manager.confirm_payment("ORD-0-MISSING", "pay_1").await;
    assert!(matches!(result, Err(FulfillError::NotFound(_))));
}

#[tokio::test]
async fn test_confirm_payment_leaves_order_untouched_on_invoice_failure() {
    let blobs = Arc::new(OutageBlobStore::new());
    let (store, manager) = fixture_with_blobs(blobs.clone());
    let order = manager
        .create_order("user-1", &sample_cart(), address(), None, "card", "USD")
        .await
        .unwrap();

    blobs.set_down(true);
    let failed = manager.confirm_payment(&order.id, "pay_123").await;
    assert!(matches!(failed, Err(FulfillError::Storage(_))));

    // The failed confirmation recorded nothing: no payment, no status
    // advance, no invoice, no payment notification.
    let after = manager.get_order(&order.id).await.unwrap();
    assert_eq!(after.payment_status, PaymentStatus::Pending);
    assert_eq!(after.status, OrderStatus::Processing);
    assert!(after.invoice_url.is_none());
    use carton_order::repository::InvoiceRepository;
    assert!(store.get(&order.id).await.unwrap().is_none());
    assert!(!store
        .all_notifications()
        .await
        .iter()
        .any(|n| n.event == NotificationEvent::PaymentConfirmed));

    // Once the blob backend recovers, the retried confirmation completes
    // end to end.
    blobs.set_down(false);
    let paid = manager.confirm_payment(&order.id, "pay_123").await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Completed);
    assert_eq!(paid.status, OrderStatus::ReadyToShip);
    assert!(paid.invoice_url.is_some());
    assert!(store.get(&order.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_confirm_payment_backfills_missing_invoice() {
    // A payment recorded by an earlier run that never produced an invoice
    // gets its document regenerated on the next confirmation.
    let fx = fixture();
    let order_id = checkout(&fx).await;

    use carton_order::repository::OrderRepository;
    fx.store
        .set_payment(&order_id, PaymentStatus::Completed, "pay_123")
        .await
        .unwrap();

    let order = fx.manager.confirm_payment(&order_id, "pay_123").await.unwrap();
    assert!(order.invoice_url.is_some());
    use carton_order::repository::InvoiceRepository;
    assert!(fx.store.get(&order_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_invoice_regeneration_overwrites() {
    let fx = fixture();
    let order_id = checkout(&fx).await;
    fx.manager.confirm_payment(&order_id, "pay_123").await.unwrap();

    let invoices = Arc::new(InvoiceGenerator::new(
        fx.store.clone(),
        fx.store.clone(),
        fx.blobs.clone(),
    ));
    let url_again = invoices.generate(&order_id).await.unwrap();

    use carton_order::repository::InvoiceRepository;
    let invoice = fx.store.get(&order_id).await.unwrap().unwrap();
    assert_eq!(invoice.document_url, url_again);
    // Same deterministic path, so still exactly one stored document.
    assert_eq!(fx.blobs.blob_count().await, 1);
}

#[tokio::test]
async fn test_tracking_advances_forward_only() {
    let fx = fixture();
    let order_id = checkout(&fx).await;
    fx.manager.confirm_payment(&order_id, "pay_123").await.unwrap();

    let shipped = fx
        .manager
        .ingest_tracking_event(&order_id, mock_tracking_event("TRK1", "in_transit"))
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let delivered = fx
        .manager
        .ingest_tracking_event(&order_id, mock_tracking_event("TRK1", "delivered"))
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);

    // A late "shipped" ping after delivery is recorded but never regresses
    // the status.
    let late = fx
        .manager
        .ingest_tracking_event(&order_id, mock_tracking_event("TRK1", "in_transit"))
        .await
        .unwrap();
    assert_eq!(late.status, OrderStatus::Delivered);
    assert_eq!(fx.store.tracking_row_count(&order_id).await, 3);
}

#[tokio::test]
async fn test_history_is_ordered_by_occurrence_not_arrival() {
    let fx = fixture();
    let order_id = checkout(&fx).await;

    let now = Utc::now();
    let mut newer = mock_tracking_event("TRK1", "out_for_delivery");
    newer.occurred_at = now;
    let mut older = mock_tracking_event("TRK1", "in_transit");
    older.occurred_at = now - Duration::hours(6);

    // Carrier delivers the newer event first.
    fx.manager.ingest_tracking_event(&order_id, newer).await.unwrap();
    fx.manager.ingest_tracking_event(&order_id, older).await.unwrap();

    let history = fx.manager.tracking_history(&order_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status_code, "in_transit");
    assert_eq!(history[1].status_code, "out_for_delivery");

    // The stale in_transit arriving second did not pull the status back.
    let order = fx.manager.get_order(&order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::OutForDelivery);
}

#[tokio::test]
async fn test_unknown_carrier_code_defaults_to_shipped() {
    let fx = fixture();
    let order_id = checkout(&fx).await;

    let order = fx
        .manager
        .ingest_tracking_event(&order_id, mock_tracking_event("TRK1", "customs_hold"))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);
    assert_eq!(fx.store.tracking_row_count(&order_id).await, 1);
}

#[tokio::test]
async fn test_duplicate_delivery_creates_one_confirmation() {
    let fx = fixture();
    let order_id = checkout(&fx).await;

    let mut event = mock_tracking_event("TRK1", "delivered");
    event.raw = serde_json::json!({
        "status": "delivered",
        "signature_url": "https://carrier.test/sig/1.png",
    });
    fx.manager
        .ingest_tracking_event(&order_id, event.clone())
        .await
        .unwrap();
    fx.manager.ingest_tracking_event(&order_id, event).await.unwrap();

    let confirmation = fx
        .manager
        .delivery_confirmation(&order_id)
        .await
        .unwrap()
        .expect("confirmation must exist");
    assert_eq!(
        confirmation.signature_url.as_deref(),
        Some("https://carrier.test/sig/1.png")
    );
    // Recipient falls back to the shipping-address name.
    assert_eq!(confirmation.recipient_name.as_deref(), Some("Grace Hopper"));

    let order = fx.manager.get_order(&order_id).await.unwrap();
    assert!(order.delivered_at.is_some());
    assert_eq!(fx.store.tracking_row_count(&order_id).await, 2);
}

#[tokio::test]
async fn test_delivery_event_without_proof_still_confirms() {
    let fx = fixture();
    let order_id = checkout(&fx).await;

    let mut event = mock_tracking_event("TRK1", "delivered");
    event.raw = serde_json::Value::Null;
    fx.manager.ingest_tracking_event(&order_id, event).await.unwrap();

    let confirmation = fx
        .manager
        .delivery_confirmation(&order_id)
        .await
        .unwrap()
        .unwrap();
    assert!(confirmation.signature_url.is_none());
    assert!(confirmation.photo_url.is_none());
}

#[tokio::test]
async fn test_admin_override_and_status_notifications() {
    let fx = fixture();
    let order_id = checkout(&fx).await;

    let order = fx
        .manager
        .update_order_status(&order_id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);

    // Re-asserting the current status is fine; rewinding is not.
    let order = fx
        .manager
        .update_order_status(&order_id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);
    let rewound = fx
        .manager
        .update_order_status(&order_id, OrderStatus::Processing)
        .await;
    assert!(matches!(rewound, Err(FulfillError::Validation(_))));

    let order = fx
        .manager
        .update_order_status(&order_id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    // Delivered orders cannot be pulled back into the pipeline.
    let reopened = fx
        .manager
        .update_order_status(&order_id, OrderStatus::ReadyToShip)
        .await;
    assert!(matches!(reopened, Err(FulfillError::Validation(_))));
    let order = fx.manager.get_order(&order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);

    let events: Vec<NotificationEvent> = fx
        .store
        .all_notifications()
        .await
        .into_iter()
        .map(|n| n.event)
        .collect();
    // Each applied override enqueued its mapped notification; the
    // rejected ones enqueued nothing.
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == NotificationEvent::OrderShipped)
            .count(),
        2
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == NotificationEvent::OrderDelivered)
            .count(),
        1
    );
    assert_eq!(events.len(), 4); // confirmation + 2x shipped + delivered
}

#[tokio::test]
async fn test_label_purchase_records_tracking_number() {
    let fx = fixture();
    let order_id = checkout(&fx).await;

    let quote = fx
        .gateway
        .create_shipment(
            &address(),
            &carton_core::carrier::Parcel::from_weight(500),
            &OriginProfile {
                company: "Carton".into(),
                address: address(),
            },
        )
        .await
        .unwrap();

    let label = fx
        .manager
        .purchase_label(&order_id, &quote.shipment_id, &quote.rates[0].rate_id)
        .await
        .unwrap();

    let order = fx.manager.get_order(&order_id).await.unwrap();
    assert_eq!(order.tracking_number.as_deref(), Some(label.tracking_number.as_str()));
}

#[tokio::test]
async fn test_rate_cache_over_memory_store() {
    let fx = fixture();
    let origin = OriginProfile {
        company: "Carton".into(),
        address: address(),
    };
    let cache = RateCache::new(
        fx.store.clone(),
        fx.gateway.clone(),
        origin,
        Duration::hours(24),
    );

    let first = cache.get_or_create(&address(), 750).await.unwrap();
    let second = cache.get_or_create(&address(), 750).await.unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(fx.gateway.create_shipment_calls(), 1);
}

#[tokio::test]
async fn test_notification_drain_hook() {
    let fx = fixture();
    checkout(&fx).await;

    use carton_order::repository::NotificationRepository;
    let pending = fx.store.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);

    fx.store.mark_dispatched(pending[0].id).await.unwrap();
    assert!(fx.store.list_pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_to_delivery_scenario() {
    // The canonical scenario: 2 x 50.00 + 1 x 30.00 -> 130.00 total,
    // payment, invoice, in_transit, delivered.
    let fx = fixture();
    let order = fx
        .manager
        .create_order("user-1", &sample_cart(), address(), None, "card", "USD")
        .await
        .unwrap();
    assert_eq!(order.total_cents, 13000);

    let paid = fx.manager.confirm_payment(&order.id, "pay_abc").await.unwrap();
    assert_eq!(paid.status, OrderStatus::ReadyToShip);
    use carton_order::repository::InvoiceRepository;
    let invoice = fx.store.get(&order.id).await.unwrap().unwrap();
    assert_eq!(invoice.total_cents, 13000);

    let shipped = fx
        .manager
        .ingest_tracking_event(&order.id, mock_tracking_event("TRK9", "in_transit"))
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(fx.manager.tracking_history(&order.id).await.unwrap().len(), 1);

    let delivered = fx
        .manager
        .ingest_tracking_event(&order.id, mock_tracking_event("TRK9", "delivered"))
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.delivered_at.is_some());
    assert!(fx
        .manager
        .delivery_confirmation(&order.id)
        .await
        .unwrap()
        .is_some());
}
