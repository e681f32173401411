pub mod http_gateway;
pub mod mock;
pub mod rates;

pub use http_gateway::{CarrierConfig, HttpCarrierGateway};
pub use mock::MockCarrierGateway;
pub use rates::{RateCache, RateQuoteRepository, ShippingRateQuote};
