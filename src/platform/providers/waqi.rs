//! World Air Quality Index (waqi.info) feed.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::air_monitor::{Measurement, Provider, ProviderError, Reading};
use crate::core::config::{ProviderKind, SourceConfig};

const DEFAULT_ENDPOINT: &str = "http://api.waqi.info";

pub struct WaqiProvider {
    client: reqwest::Client,
}

impl WaqiProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn url(source: &SourceConfig) -> String {
        let endpoint = source.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        format!(
            "{}/feed/{}/",
            endpoint.trim_end_matches('/'),
            source.city.as_deref().unwrap_or_default()
        )
    }
}

#[async_trait]
impl Provider for WaqiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Waqi
    }

    async fn poll(&mut self, source: &SourceConfig) -> Result<Reading, ProviderError> {
        let url = Self::url(source);
        log::debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("token", source.token.as_deref().unwrap_or_default())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let observations: Value = response.json().await?;
        parse_feed(&observations, source)
    }
}

/// Short code of the individual index a measurement is published under
fn iaqi_code(measurement: Measurement) -> Option<&'static str> {
    match measurement {
        Measurement::Temperature => Some("t"),
        Measurement::Pressure => Some("p"),
        Measurement::Co => Some("co"),
        Measurement::No2 => Some("no2"),
        Measurement::O3 => Some("o3"),
        Measurement::Pm25 => Some("pm25"),
        Measurement::Pm10 => Some("pm10"),
        Measurement::So2 => Some("so2"),
        _ => None,
    }
}

/// Validate the envelope and extract the requested keys.
pub fn parse_feed(observations: &Value, source: &SourceConfig) -> Result<Reading, ProviderError> {
    match observations.get("status").and_then(Value::as_str) {
        Some("ok") => {}
        Some("error") => {
            let message = match observations.get("data") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => "unknown error".to_string(),
            };
            return Err(ProviderError::Upstream(message));
        }
        other => {
            return Err(ProviderError::Payload(format!(
                "unexpected status {:?}",
                other
            )))
        }
    }

    let data = observations
        .get("data")
        .ok_or_else(|| ProviderError::Payload("missing data".to_string()))?;

    // idx is -1 (number or string) for an unknown city
    let invalid_city = match data.get("idx") {
        Some(Value::Number(n)) => n.as_i64() == Some(-1),
        Some(Value::String(s)) => s == "-1",
        _ => false,
    };
    if invalid_city {
        return Err(ProviderError::InvalidCity);
    }

    let iaqi = data.get("iaqi");
    let mut reading = Reading::new();
    for &key in &source.keys {
        let Some(code) = iaqi_code(key) else {
            log::error!("Source '{}': unsupported key {}", source.id, key);
            continue;
        };

        let value = iaqi
            .and_then(|i| i.get(code))
            .and_then(|entry| entry.get("v"))
            .and_then(as_number);

        match value {
            Some(v) => reading.set(key, v),
            None => log::warn!("Source '{}': null value for {}", source.id, key),
        }
    }

    Ok(reading)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
