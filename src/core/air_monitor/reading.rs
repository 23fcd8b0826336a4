use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Kind of value a source can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Measurement {
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "pressure")]
    Pressure,
    #[serde(rename = "co")]
    Co,
    #[serde(rename = "co2")]
    Co2,
    #[serde(rename = "no2")]
    No2,
    #[serde(rename = "o3")]
    O3,
    #[serde(rename = "pm2.5")]
    Pm25,
    #[serde(rename = "pm10")]
    Pm10,
    #[serde(rename = "so2")]
    So2,
    #[serde(rename = "voc")]
    Voc,
}

impl Measurement {
    /// All measurements in journal column order
    pub const ALL: [Measurement; 11] = [
        Measurement::Temperature,
        Measurement::Humidity,
        Measurement::Pressure,
        Measurement::Co,
        Measurement::Co2,
        Measurement::No2,
        Measurement::O3,
        Measurement::Pm25,
        Measurement::Pm10,
        Measurement::So2,
        Measurement::Voc,
    ];

    /// Configuration key, e.g. `pm2.5`
    pub fn key(&self) -> &'static str {
        match self {
            Measurement::Temperature => "temperature",
            Measurement::Humidity => "humidity",
            Measurement::Pressure => "pressure",
            Measurement::Co => "co",
            Measurement::Co2 => "co2",
            Measurement::No2 => "no2",
            Measurement::O3 => "o3",
            Measurement::Pm25 => "pm2.5",
            Measurement::Pm10 => "pm10",
            Measurement::So2 => "so2",
            Measurement::Voc => "voc",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Measurement::Temperature => "°C",
            Measurement::Humidity => "%",
            Measurement::Pressure => "hPa",
            _ => "µg/m³",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Measurement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Measurement::ALL
            .iter()
            .copied()
            .find(|m| m.key() == s)
            .ok_or_else(|| format!("unknown measurement '{}'", s))
    }
}

/// Latest values of one source. Keys that were never resolved are simply missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    values: BTreeMap<Measurement, f64>,
}

impl Reading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, measurement: Measurement) -> Option<f64> {
        self.values.get(&measurement).copied()
    }

    pub fn set(&mut self, measurement: Measurement, value: f64) {
        self.values.insert(measurement, value);
    }

    pub fn contains(&self, measurement: Measurement) -> bool {
        self.values.contains_key(&measurement)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Measurement, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    /// Overwrite the keys present in `other`; keys not in `other` keep their old value.
    pub fn merge(&mut self, other: &Reading) {
        for (measurement, value) in other.iter() {
            self.values.insert(measurement, value);
        }
    }

    /// Add calibration offsets to the keys that are present. Missing keys stay missing.
    pub fn apply_offsets(&mut self, offsets: &HashMap<Measurement, f64>) {
        for (measurement, offset) in offsets {
            if let Some(value) = self.values.get_mut(measurement) {
                *value += offset;
            }
        }
    }
}

impl FromIterator<(Measurement, f64)> for Reading {
    fn from_iter<I: IntoIterator<Item = (Measurement, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Source id → latest reading. One entry per configured source, created up front.
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    readings: HashMap<String, Reading>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty entry for every id
    pub fn with_sources<'a, I: IntoIterator<Item = &'a str>>(ids: I) -> Self {
        Self {
            readings: ids
                .into_iter()
                .map(|id| (id.to_string(), Reading::new()))
                .collect(),
        }
    }

    pub fn get(&self, source_id: &str) -> Option<&Reading> {
        self.readings.get(source_id)
    }

    pub fn value(&self, source_id: &str, measurement: Measurement) -> Option<f64> {
        self.readings.get(source_id)?.get(measurement)
    }

    pub fn entry(&mut self, source_id: &str) -> &mut Reading {
        self.readings.entry(source_id.to_string()).or_default()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
