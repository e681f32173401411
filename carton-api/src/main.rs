use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use carton_api::{app, state::AppState};
use carton_core::carrier::CarrierGateway;
use carton_order::{InvoiceGenerator, NotificationQueue, OrderManager};
use carton_shipping::{CarrierConfig, HttpCarrierGateway, MockCarrierGateway, RateCache};
use carton_store::{MemoryBlobStore, MemoryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carton_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = carton_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Carton API on port {}", config.server.port);

    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::new(&config.blob.public_base_url));

    let gateway: Arc<dyn CarrierGateway> = match &config.carrier.base_url {
        Some(base_url) => {
            let carrier = HttpCarrierGateway::new(CarrierConfig {
                base_url: base_url.clone(),
                api_token: config.carrier.api_token.clone(),
                timeout: Duration::from_secs(config.carrier.timeout_seconds),
            })
            .expect("Failed to build carrier client");
            Arc::new(carrier)
        }
        None => {
            tracing::warn!("no carrier base_url configured; using mock carrier gateway");
            Arc::new(MockCarrierGateway::new())
        }
    };

    let invoices = Arc::new(InvoiceGenerator::new(
        store.clone(),
        store.clone(),
        blobs.clone(),
    ));
    let notifications = NotificationQueue::new(store.clone());
    let manager = Arc::new(OrderManager::new(
        store.clone(),
        store.clone(),
        store.clone(),
        invoices,
        notifications,
        gateway.clone(),
    ));

    let rate_cache = Arc::new(RateCache::new(
        store.clone(),
        gateway,
        config.carrier.origin.to_profile(),
        chrono::Duration::hours(config.rates.ttl_hours),
    ));

    let state = AppState {
        manager,
        rate_cache,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app(state)).await.unwrap();
}
