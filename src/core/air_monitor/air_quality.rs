//! Composite air quality index.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::reading::Measurement;
use crate::error::{AirqError, Result};

pub const DEFAULT_INDEX: &str = "caqi";

/// Overall air quality, ordered from best to worst.
///
/// The numeric value matches the HomeKit `AirQuality` characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirQuality {
    Unknown = 0,
    Excellent = 1,
    Good = 2,
    Fair = 3,
    Inferior = 4,
    Poor = 5,
}

impl AirQuality {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => AirQuality::Excellent,
            1 => AirQuality::Good,
            2 => AirQuality::Fair,
            3 => AirQuality::Inferior,
            _ => AirQuality::Poor,
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Five stars for excellent down to one for poor
    pub fn stars(&self) -> String {
        match self {
            AirQuality::Unknown => "?".to_string(),
            other => "*".repeat(6 - other.value() as usize),
        }
    }
}

impl fmt::Display for AirQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AirQuality::Unknown => "unknown",
            AirQuality::Excellent => "excellent",
            AirQuality::Good => "good",
            AirQuality::Fair => "fair",
            AirQuality::Inferior => "inferior",
            AirQuality::Poor => "poor",
        };
        write!(f, "{}", label)
    }
}

pub trait AirQualityIndex: Send + Sync {
    fn name(&self) -> &'static str;

    /// `value` yields the current density of a pollutant, `None` when unset
    fn compute(&self, value: &dyn Fn(Measurement) -> Option<f64>) -> AirQuality;
}

/// Common Air Quality Index (CAQI), hourly background grid.
pub struct CommonAirQualityIndex;

impl CommonAirQualityIndex {
    /// Upper bounds of levels 0..=3, a value at or above the last one is level 4
    const GRID: [(Measurement, [f64; 4]); 4] = [
        (Measurement::No2, [50.0, 100.0, 200.0, 400.0]),
        (Measurement::Pm10, [25.0, 50.0, 90.0, 180.0]),
        (Measurement::O3, [60.0, 120.0, 180.0, 240.0]),
        (Measurement::Pm25, [15.0, 30.0, 55.0, 110.0]),
    ];

    pub fn level(measurement: Measurement, value: f64) -> Option<u8> {
        let (_, bounds) = Self::GRID.iter().find(|(m, _)| *m == measurement)?;
        let level = bounds.iter().take_while(|&&bound| value >= bound).count();
        Some(level as u8)
    }
}

impl AirQualityIndex for CommonAirQualityIndex {
    fn name(&self) -> &'static str {
        "caqi"
    }

    fn compute(&self, value: &dyn Fn(Measurement) -> Option<f64>) -> AirQuality {
        Self::GRID
            .iter()
            .filter_map(|(m, _)| value(*m).and_then(|v| Self::level(*m, v)))
            .max()
            .map(AirQuality::from_level)
            .unwrap_or(AirQuality::Unknown)
    }
}

/// Look up an index algorithm by its configured name
pub fn index_by_name(name: &str) -> Result<Box<dyn AirQualityIndex>> {
    match name {
        "caqi" => Ok(Box::new(CommonAirQualityIndex)),
        other => Err(AirqError::config(format!(
            "unknown air quality index '{}'",
            other
        ))),
    }
}
