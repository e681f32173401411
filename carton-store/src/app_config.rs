use serde::Deserialize;
use std::env;

use carton_core::carrier::{Address, OriginProfile};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub carrier: CarrierSettings,
    pub blob: BlobConfig,
    pub rates: RatesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CarrierSettings {
    /// Unset means no real carrier is configured; the API falls back to
    /// the in-process mock gateway.
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    pub origin: OriginConfig,
}

fn default_timeout_seconds() -> u64 {
    10
}

/// Merchant ship-from profile, flattened for config files.
#[derive(Debug, Deserialize, Clone)]
pub struct OriginConfig {
    pub company: String,
    pub name: String,
    pub street1: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

impl OriginConfig {
    pub fn to_profile(&self) -> OriginProfile {
        OriginProfile {
            company: self.company.clone(),
            address: Address {
                name: self.name.clone(),
                street1: self.street1.clone(),
                street2: None,
                city: self.city.clone(),
                region: self.region.clone(),
                postal_code: self.postal_code.clone(),
                country: self.country.clone(),
                phone: None,
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlobConfig {
    pub public_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RatesConfig {
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

fn default_ttl_hours() -> i64 {
    24
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Env overrides, e.g. CARTON_SERVER__PORT=9090
            .add_source(config::Environment::with_prefix("CARTON").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
