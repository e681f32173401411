use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carton_core::carrier::{Address, CarrierGateway, CarrierRate, OriginProfile, Parcel};
use carton_core::FulfillResult;

/// A cached carrier rate quote, keyed by (destination postal code, parcel
/// weight). Cached, not authoritative: rows are replaced, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingRateQuote {
    pub id: Uuid,
    pub dest_postal_code: String,
    pub weight_grams: u32,
    pub shipment_id: String,
    pub rate_id: String,
    pub carrier: String,
    pub service: String,
    pub amount_cents: i64,
    pub currency: String,
    pub est_delivery_days: Option<u32>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ShippingRateQuote {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Storage for cached rate quotes. Lookups exclude expired rows; nothing
/// here purges them (cleanup belongs to an external retention policy).
#[async_trait]
pub trait RateQuoteRepository: Send + Sync {
    async fn find_unexpired(
        &self,
        dest_postal_code: &str,
        weight_grams: u32,
        now: DateTime<Utc>,
    ) -> FulfillResult<Vec<ShippingRateQuote>>;

    async fn insert_quotes(&self, quotes: &[ShippingRateQuote]) -> FulfillResult<()>;
}

/// Read-through cache in front of the carrier's rating API with a fixed
/// time-to-live per key.
pub struct RateCache {
    quotes: Arc<dyn RateQuoteRepository>,
    carrier: Arc<dyn CarrierGateway>,
    origin: OriginProfile,
    ttl: Duration,
}

impl RateCache {
    pub fn new(
        quotes: Arc<dyn RateQuoteRepository>,
        carrier: Arc<dyn CarrierGateway>,
        origin: OriginProfile,
        ttl: Duration,
    ) -> Self {
        Self {
            quotes,
            carrier,
            origin,
            ttl,
        }
    }

    /// Return unexpired quotes for the destination/weight key, cheapest
    /// first, fetching fresh rates from the carrier on a miss.
    ///
    /// Carrier failures during a miss surface to the caller and leave the
    /// cache untouched, so the next call retries the gateway.
    pub async fn get_or_create(
        &self,
        destination: &Address,
        weight_grams: u32,
    ) -> FulfillResult<Vec<ShippingRateQuote>> {
        let now = Utc::now();
        let mut cached = self
            .quotes
            .find_unexpired(&destination.postal_code, weight_grams, now)
            .await?;

        if !cached.is_empty() {
            sort_cheapest_first(&mut cached);
            tracing::debug!(
                postal_code = %destination.postal_code,
                weight_grams,
                count = cached.len(),
                "rate cache hit"
            );
            return Ok(cached);
        }

        let shipment = self
            .carrier
            .create_shipment(destination, &Parcel::from_weight(weight_grams), &self.origin)
            .await?;

        let expires_at = now + self.ttl;
        let mut fresh: Vec<ShippingRateQuote> = shipment
            .rates
            .iter()
            .map(|rate| quote_from_rate(rate, &shipment.shipment_id, destination, weight_grams, now, expires_at))
            .collect();

        self.quotes.insert_quotes(&fresh).await?;
        sort_cheapest_first(&mut fresh);
        tracing::info!(
            postal_code = %destination.postal_code,
            weight_grams,
            count = fresh.len(),
            "rate cache refreshed from carrier"
        );
        Ok(fresh)
    }
}

fn quote_from_rate(
    rate: &CarrierRate,
    shipment_id: &str,
    destination: &Address,
    weight_grams: u32,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> ShippingRateQuote {
    ShippingRateQuote {
        id: Uuid::new_v4(),
        dest_postal_code: destination.postal_code.clone(),
        weight_grams,
        shipment_id: shipment_id.to_string(),
        rate_id: rate.rate_id.clone(),
        carrier: rate.carrier.clone(),
        service: rate.service.clone(),
        amount_cents: rate.amount_cents,
        currency: rate.currency.clone(),
        est_delivery_days: rate.est_delivery_days,
        expires_at,
        created_at: now,
    }
}

/// Cheapest first; ties broken by cost over speed deliberately, so equal
/// prices keep their relative order.
fn sort_cheapest_first(quotes: &mut [ShippingRateQuote]) {
    quotes.sort_by_key(|q| q.amount_cents);
}
