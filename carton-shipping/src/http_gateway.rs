use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use carton_core::carrier::{
    Address, CarrierGateway, CarrierRate, CarrierTrackingEvent, OriginProfile, Parcel,
    ShipmentQuote, ShippingLabel, TrackingSnapshot,
};
use carton_core::{FulfillError, FulfillResult};

/// Connection settings for the carrier service.
#[derive(Debug, Clone)]
pub struct CarrierConfig {
    /// Carrier API base, e.g. `"https://api.carrier.example"`.
    pub base_url: String,
    pub api_token: String,
    /// Per-request timeout; no carrier call may hang.
    pub timeout: Duration,
}

/// HTTP adapter for a third-party carrier API.
///
/// Thin by necessity: no state beyond the request in flight. Non-2xx
/// responses and malformed payloads surface as `FulfillError::Carrier`
/// with the upstream status; timeouts as `FulfillError::Timeout`.
pub struct HttpCarrierGateway {
    config: CarrierConfig,
    http: Client,
}

impl HttpCarrierGateway {
    pub fn new(config: CarrierConfig) -> FulfillResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FulfillError::storage(format!("carrier client init: {e}")))?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn parse_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> FulfillResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FulfillError::Carrier {
                status: Some(status.as_u16()),
                message: format!("carrier returned {status}: {body}"),
            });
        }
        response.json::<T>().await.map_err(|e| FulfillError::Carrier {
            status: Some(status.as_u16()),
            message: format!("malformed carrier payload: {e}"),
        })
    }
}

fn request_error(err: reqwest::Error) -> FulfillError {
    if err.is_timeout() {
        FulfillError::Timeout(format!("carrier request timed out: {err}"))
    } else {
        FulfillError::Carrier {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateShipmentResponse {
    shipment_id: String,
    rates: Vec<CarrierRate>,
}

#[derive(Debug, Deserialize)]
struct BuyLabelResponse {
    label_url: String,
    tracking_number: String,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    tracking_number: String,
    latest_status: String,
    events: Vec<CarrierTrackingEvent>,
}

#[async_trait]
impl CarrierGateway for HttpCarrierGateway {
    async fn create_shipment(
        &self,
        destination: &Address,
        parcel: &Parcel,
        origin: &OriginProfile,
    ) -> FulfillResult<ShipmentQuote> {
        let body = serde_json::json!({
            "destination": destination,
            "parcel": parcel,
            "origin": origin,
        });

        let response = self
            .http
            .post(self.url("/v1/shipments"))
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let parsed: CreateShipmentResponse = self.parse_response(response).await?;
        tracing::debug!(
            shipment_id = %parsed.shipment_id,
            rates = parsed.rates.len(),
            "carrier shipment created"
        );
        Ok(ShipmentQuote {
            shipment_id: parsed.shipment_id,
            rates: parsed.rates,
        })
    }

    async fn buy_label(&self, shipment_id: &str, rate_id: &str) -> FulfillResult<ShippingLabel> {
        let body = serde_json::json!({ "rate_id": rate_id });

        let response = self
            .http
            .post(self.url(&format!("/v1/shipments/{shipment_id}/labels")))
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let parsed: BuyLabelResponse = self.parse_response(response).await?;
        Ok(ShippingLabel {
            label_url: parsed.label_url,
            tracking_number: parsed.tracking_number,
        })
    }

    async fn track_shipment(&self, tracking_number: &str) -> FulfillResult<TrackingSnapshot> {
        let response = self
            .http
            .get(self.url(&format!("/v1/tracking/{tracking_number}")))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(request_error)?;

        let parsed: TrackResponse = self.parse_response(response).await?;
        Ok(TrackingSnapshot {
            tracking_number: parsed.tracking_number,
            latest_status: parsed.latest_status,
            events: parsed.events,
        })
    }
}
