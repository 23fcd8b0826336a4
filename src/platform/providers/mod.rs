//! Source adapters.
//!
//! One adapter per provider kind: sensor.community and WAQI over HTTP, and a
//! BME280 read through the Linux IIO subsystem.

mod bme280;
mod sensor_community;
mod waqi;

pub use bme280::Bme280Provider;
pub use sensor_community::SensorCommunityProvider;
pub use waqi::WaqiProvider;

use crate::core::air_monitor::BoxedProvider;
use crate::core::config::{ProviderKind, SourceConfig};
use crate::error::{AirqError, Result};

/// Shared HTTP client for all web providers
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("airq/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(AirqError::from)
}

/// Build the adapter for a source
///
/// Returns a configuration error for an unknown provider kind.
pub fn create_provider(source: &SourceConfig, client: &reqwest::Client) -> Result<BoxedProvider> {
    match &source.provider {
        ProviderKind::SensorCommunity => Ok(Box::new(SensorCommunityProvider::new(client.clone()))),
        ProviderKind::Waqi => Ok(Box::new(WaqiProvider::new(client.clone()))),
        ProviderKind::Bme280 => Ok(Box::new(Bme280Provider::new())),
        ProviderKind::Unknown(name) => Err(AirqError::config(format!(
            "unknown provider '{}' for source '{}'",
            name, source.id
        ))),
    }
}
