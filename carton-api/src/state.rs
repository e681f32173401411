use std::sync::Arc;

use carton_order::OrderManager;
use carton_shipping::RateCache;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<OrderManager>,
    pub rate_cache: Arc<RateCache>,
}
