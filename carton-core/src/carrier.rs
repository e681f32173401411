use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::FulfillResult;

/// Structured postal address, used both as an order's shipping address and
/// as a shipment destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub name: String,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

/// Physical parcel dimensions for rating and label purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub weight_grams: u32,
    pub length_cm: Option<u32>,
    pub width_cm: Option<u32>,
    pub height_cm: Option<u32>,
}

impl Parcel {
    pub fn from_weight(weight_grams: u32) -> Self {
        Self {
            weight_grams,
            length_cm: None,
            width_cm: None,
            height_cm: None,
        }
    }
}

/// Merchant ship-from profile sent with every shipment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginProfile {
    pub company: String,
    pub address: Address,
}

/// One carrier price/time offer as returned by the carrier API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierRate {
    pub rate_id: String,
    pub carrier: String,
    pub service: String,
    pub amount_cents: i64,
    pub currency: String,
    pub est_delivery_days: Option<u32>,
}

/// Result of registering a shipment with the carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentQuote {
    pub shipment_id: String,
    pub rates: Vec<CarrierRate>,
}

/// Purchased shipping label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingLabel {
    pub label_url: String,
    pub tracking_number: String,
}

/// A carrier-reported point-in-time status update for a shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierTrackingEvent {
    pub tracking_number: String,
    pub status_code: String,
    pub description: String,
    pub location: Option<String>,
    pub carrier: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// Latest status plus full event history for a tracking number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub tracking_number: String,
    pub latest_status: String,
    pub events: Vec<CarrierTrackingEvent>,
}

/// Client for an external carrier service.
///
/// Every method is a network call: fallible, retryable by the caller, and
/// bounded by a timeout. Implementations hold no state beyond the request
/// in flight.
#[async_trait]
pub trait CarrierGateway: Send + Sync {
    /// Register a shipment and obtain rate offers.
    async fn create_shipment(
        &self,
        destination: &Address,
        parcel: &Parcel,
        origin: &OriginProfile,
    ) -> FulfillResult<ShipmentQuote>;

    /// Purchase a label for a previously created shipment at a chosen rate.
    async fn buy_label(&self, shipment_id: &str, rate_id: &str) -> FulfillResult<ShippingLabel>;

    /// Fetch latest status and event history for a tracking number.
    async fn track_shipment(&self, tracking_number: &str) -> FulfillResult<TrackingSnapshot>;
}
