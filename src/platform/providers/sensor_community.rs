//! sensor.community (formerly luftdaten.info) aggregator.
//!
//! The API returns the records a sensor pushed during the last minutes. Only the
//! most recent record is used.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::air_monitor::{Measurement, Provider, ProviderError, Reading};
use crate::core::config::{ProviderKind, SourceConfig};

const DEFAULT_ENDPOINT: &str = "http://data.sensor.community";

#[derive(Debug, Deserialize)]
struct SensorRecord {
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    sensordatavalues: Vec<DataValue>,
}

#[derive(Debug, Deserialize)]
struct DataValue {
    value_type: String,
    value: Value,
}

pub struct SensorCommunityProvider {
    client: reqwest::Client,
}

impl SensorCommunityProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn url(source: &SourceConfig) -> String {
        let endpoint = source.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        format!(
            "{}/airrohr/v1/sensor/{}/",
            endpoint.trim_end_matches('/'),
            source.sensor.as_deref().unwrap_or_default()
        )
    }
}

#[async_trait]
impl Provider for SensorCommunityProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SensorCommunity
    }

    async fn poll(&mut self, source: &SourceConfig) -> Result<Reading, ProviderError> {
        let url = Self::url(source);
        log::debug!("Fetching {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        parse_records(&payload, source)
    }
}

/// Extract the requested keys from the newest record of the payload.
pub fn parse_records(payload: &Value, source: &SourceConfig) -> Result<Reading, ProviderError> {
    let records: Vec<SensorRecord> = serde_json::from_value(payload.clone())
        .map_err(|e| ProviderError::Payload(e.to_string()))?;

    // Timestamps are "YYYY-MM-DD HH:MM:SS", so string order is time order
    let latest = records
        .iter()
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
        .ok_or_else(|| ProviderError::Payload("no records".to_string()))?;

    let mut reading = Reading::new();
    for &key in &source.keys {
        let value_type = match key {
            Measurement::Temperature => "temperature",
            Measurement::Humidity => "humidity",
            Measurement::Pressure => "pressure",
            Measurement::Pm25 => "P2",
            Measurement::Pm10 => "P1",
            other => {
                log::error!("Source '{}': unsupported key {}", source.id, other);
                continue;
            }
        };

        match lookup(latest, value_type) {
            // Pressure is published in Pa
            Some(v) if key == Measurement::Pressure => reading.set(key, v / 100.0),
            Some(v) => reading.set(key, v),
            None => log::warn!("Source '{}': null value for {}", source.id, key),
        }
    }

    Ok(reading)
}

/// A zero or unparseable value counts as unavailable.
fn lookup(record: &SensorRecord, value_type: &str) -> Option<f64> {
    let raw = record
        .sensordatavalues
        .iter()
        .find(|v| v.value_type == value_type)?;

    let value = match &raw.value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };

    if value == 0.0 || value.is_nan() {
        None
    } else {
        Some(value)
    }
}
