use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use carton_core::carrier::{
    Address, CarrierGateway, CarrierRate, CarrierTrackingEvent, OriginProfile, Parcel,
    ShipmentQuote, ShippingLabel, TrackingSnapshot,
};
use carton_core::{FulfillError, FulfillResult};

/// In-process carrier double: serves scripted rates and tracking events,
/// counts rating calls, and can be flipped into a failure mode to exercise
/// upstream-error paths.
pub struct MockCarrierGateway {
    rates: Vec<CarrierRate>,
    tracking_events: Mutex<Vec<CarrierTrackingEvent>>,
    create_calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockCarrierGateway {
    pub fn new() -> Self {
        Self::with_rates(vec![CarrierRate {
            rate_id: "rate_standard".to_string(),
            carrier: "mockpost".to_string(),
            service: "ground".to_string(),
            amount_cents: 795,
            currency: "USD".to_string(),
            est_delivery_days: Some(4),
        }])
    }

    pub fn with_rates(rates: Vec<CarrierRate>) -> Self {
        Self {
            rates,
            tracking_events: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Number of successful `create_shipment` calls served.
    pub fn create_shipment_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// When set, every gateway call fails with an upstream 503.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Script the history returned by `track_shipment`.
    pub fn push_tracking_event(&self, event: CarrierTrackingEvent) {
        self.tracking_events.lock().unwrap().push(event);
    }

    fn check_available(&self) -> FulfillResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FulfillError::Carrier {
                status: Some(503),
                message: "simulated carrier outage".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MockCarrierGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarrierGateway for MockCarrierGateway {
    async fn create_shipment(
        &self,
        _destination: &Address,
        _parcel: &Parcel,
        _origin: &OriginProfile,
    ) -> FulfillResult<ShipmentQuote> {
        self.check_available()?;
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ShipmentQuote {
            shipment_id: format!("shp_{}", Uuid::new_v4().simple()),
            rates: self.rates.clone(),
        })
    }

    async fn buy_label(&self, shipment_id: &str, rate_id: &str) -> FulfillResult<ShippingLabel> {
        self.check_available()?;
        if !self.rates.iter().any(|r| r.rate_id == rate_id) {
            return Err(FulfillError::Carrier {
                status: Some(404),
                message: format!("unknown rate {rate_id}"),
            });
        }
        Ok(ShippingLabel {
            label_url: format!("https://carrier.test/labels/{shipment_id}.pdf"),
            tracking_number: format!("TRK{}", Uuid::new_v4().simple().to_string()[..12].to_uppercase()),
        })
    }

    async fn track_shipment(&self, tracking_number: &str) -> FulfillResult<TrackingSnapshot> {
        self.check_available()?;
        let events: Vec<CarrierTrackingEvent> = self
            .tracking_events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.tracking_number == tracking_number)
            .cloned()
            .collect();
        let latest_status = events
            .iter()
            .max_by_key(|e| e.occurred_at)
            .map(|e| e.status_code.clone())
            .unwrap_or_else(|| "pre_transit".to_string());
        Ok(TrackingSnapshot {
            tracking_number: tracking_number.to_string(),
            latest_status,
            events,
        })
    }
}

/// Convenience for tests: a carrier event with the given code, occurring now.
pub fn mock_tracking_event(tracking_number: &str, status_code: &str) -> CarrierTrackingEvent {
    CarrierTrackingEvent {
        tracking_number: tracking_number.to_string(),
        status_code: status_code.to_string(),
        description: format!("package {status_code}"),
        location: Some("Sorting Facility".to_string()),
        carrier: "mockpost".to_string(),
        occurred_at: Utc::now(),
        raw: serde_json::json!({ "status": status_code }),
    }
}
