use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::air_monitor::Measurement;
use crate::error::AirqError;

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 120;
const DEFAULT_HISTORY_INTERVAL_SECS: u64 = 600;
const DEFAULT_HISTORY_CAPACITY: usize = 525_600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_update_interval")]
    pub update_interval_seconds: u64,
    #[serde(default = "default_history_interval")]
    pub update_history_seconds: u64,
    /// Directory of the history journal (defaults to the user data dir)
    #[serde(default)]
    pub history_path: Option<PathBuf>,
    /// Journal file name; no journal is written when unset
    #[serde(default)]
    pub history_filename: Option<String>,
    /// Capacity of the in-memory rolling history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Upper bound for a single init/poll call. Unset means wait forever.
    #[serde(default)]
    pub poll_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub services: BTreeMap<ServiceKind, ServiceSpec>,
}

fn default_name() -> String {
    "airq".to_string()
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_history_interval() -> u64 {
    DEFAULT_HISTORY_INTERVAL_SECS
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            update_interval_seconds: DEFAULT_UPDATE_INTERVAL_SECS,
            update_history_seconds: DEFAULT_HISTORY_INTERVAL_SECS,
            history_path: None,
            history_filename: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            poll_timeout_seconds: None,
            sources: Vec::new(),
            services: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load and validate the configuration. `None` reads the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::get_config_path()?,
        };

        let data = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_json_str(&data)
            .with_context(|| format!("Invalid config file: {:?}", config_path))
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(data).with_context(|| "Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(path, data)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("airq").join("config.json"))
    }

    /// Check the invariants that must hold before the engine starts
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.update_interval_seconds == 0 {
            return Err(AirqError::config("update_interval_seconds must be greater than 0"));
        }
        if self.update_history_seconds == 0 {
            return Err(AirqError::config("update_history_seconds must be greater than 0"));
        }

        let mut ids = HashSet::new();
        for source in &self.sources {
            if source.id.is_empty() {
                return Err(AirqError::config("source with empty id"));
            }
            if !ids.insert(source.id.as_str()) {
                return Err(AirqError::config(format!("duplicate source id '{}'", source.id)));
            }
            source.validate()?;
        }

        for (kind, spec) in &self.services {
            for (measurement, binding) in &spec.fields {
                let referenced = binding.source_ids();
                if referenced.is_empty() {
                    return Err(AirqError::config(format!(
                        "service '{}' field '{}' has no sources",
                        kind, measurement
                    )));
                }
                for id in referenced {
                    if !ids.contains(id) {
                        return Err(AirqError::config(format!(
                            "service '{}' field '{}' references unknown source '{}'",
                            kind, measurement, id
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_seconds)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_seconds.map(Duration::from_secs)
    }

    /// How many update cycles make up one history sample
    pub fn history_frequency(&self) -> u64 {
        let ratio = self.update_history_seconds as f64 / self.update_interval_seconds as f64;
        (ratio.round() as u64).max(1)
    }

    /// Full path of the journal file, if journaling is enabled
    pub fn journal_path(&self) -> Option<PathBuf> {
        let filename = self.history_filename.as_ref()?;
        let dir = self
            .history_path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("airq")))
            .unwrap_or_else(|| PathBuf::from("."));
        Some(dir.join(filename))
    }

    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn service(&self, kind: ServiceKind) -> Option<&ServiceSpec> {
        self.services.get(&kind)
    }
}

/// Published logical service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Temperature,
    Humidity,
    #[serde(rename = "airquality")]
    AirQuality,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceKind::Temperature => "temperature",
            ServiceKind::Humidity => "humidity",
            ServiceKind::AirQuality => "airquality",
        })
    }
}

/// One published service: display name, index algorithm and field bindings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default)]
    pub name: String,
    /// Air-quality index algorithm, only meaningful for the air-quality service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aqi: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<Measurement, FieldBinding>,
}

impl ServiceSpec {
    pub fn binding(&self, measurement: Measurement) -> Option<&FieldBinding> {
        self.fields.get(&measurement)
    }
}

/// Where a published field gets its value from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldBinding {
    /// Passthrough of one source
    Direct(String),
    /// Reduction over several sources
    Aggregate {
        sources: Vec<String>,
        aggregate: AggregateFunction,
    },
}

impl FieldBinding {
    pub fn source_ids(&self) -> Vec<&str> {
        match self {
            FieldBinding::Direct(id) => vec![id.as_str()],
            FieldBinding::Aggregate { sources, .. } => sources.iter().map(String::as_str).collect(),
        }
    }
}

/// Aggregate function. Unrecognised names are kept so they can be reported at derive time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregateFunction {
    Minimum,
    Maximum,
    Average,
    Unknown(String),
}

impl From<String> for AggregateFunction {
    fn from(name: String) -> Self {
        match name.as_str() {
            "minimum" => AggregateFunction::Minimum,
            "maximum" => AggregateFunction::Maximum,
            "average" => AggregateFunction::Average,
            _ => AggregateFunction::Unknown(name),
        }
    }
}

impl From<AggregateFunction> for String {
    fn from(function: AggregateFunction) -> Self {
        function.to_string()
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Minimum => f.write_str("minimum"),
            AggregateFunction::Maximum => f.write_str("maximum"),
            AggregateFunction::Average => f.write_str("average"),
            AggregateFunction::Unknown(name) => f.write_str(name),
        }
    }
}

/// Provider behind a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderKind {
    /// sensor.community (formerly luftdaten.info) aggregator
    SensorCommunity,
    /// World Air Quality Index public API
    Waqi,
    /// BME280 on the local I2C bus
    Bme280,
    Unknown(String),
}

impl From<String> for ProviderKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "luftdaten.info" | "sensor.community" => ProviderKind::SensorCommunity,
            "waqi.info" => ProviderKind::Waqi,
            "bme280" => ProviderKind::Bme280,
            _ => ProviderKind::Unknown(name),
        }
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::SensorCommunity => f.write_str("sensor.community"),
            ProviderKind::Waqi => f.write_str("waqi.info"),
            ProviderKind::Bme280 => f.write_str("bme280"),
            ProviderKind::Unknown(name) => f.write_str(name),
        }
    }
}

/// Static description of one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub provider: ProviderKind,
    #[serde(default)]
    pub keys: Vec<Measurement>,
    /// Additive calibration per measurement
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub offsets: HashMap<Measurement, f64>,

    /// sensor.community sensor id
    #[serde(default, deserialize_with = "de::opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub sensor: Option<String>,
    /// WAQI city or station
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// WAQI API token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "i2cBusNo", default, deserialize_with = "de::opt_int", skip_serializing_if = "Option::is_none")]
    pub i2c_bus: Option<u32>,
    #[serde(rename = "i2cAddress", default, deserialize_with = "de::opt_int", skip_serializing_if = "Option::is_none")]
    pub i2c_address: Option<u32>,
    /// IIO device directory, bypasses bus/address discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_path: Option<PathBuf>,
    /// Base URL override for HTTP providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl SourceConfig {
    pub fn new(id: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            id: id.into(),
            provider,
            keys: Vec::new(),
            offsets: HashMap::new(),
            sensor: None,
            city: None,
            token: None,
            i2c_bus: None,
            i2c_address: None,
            device_path: None,
            endpoint: None,
        }
    }

    pub fn with_keys(mut self, keys: &[Measurement]) -> Self {
        self.keys = keys.to_vec();
        self
    }

    pub fn with_offset(mut self, measurement: Measurement, offset: f64) -> Self {
        self.offsets.insert(measurement, offset);
        self
    }

    fn validate(&self) -> crate::error::Result<()> {
        match self.provider {
            ProviderKind::SensorCommunity if self.sensor.is_none() => Err(AirqError::config(
                format!("source '{}' needs a 'sensor' id", self.id),
            )),
            ProviderKind::Waqi if self.city.is_none() || self.token.is_none() => Err(
                AirqError::config(format!("source '{}' needs 'city' and 'token'", self.id)),
            ),
            _ => Ok(()),
        }
    }
}

/// Lenient deserializers for values users write either as numbers or strings
mod de {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }))
    }

    /// Accepts `118`, `"118"` and `"0x76"`
    pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(value) = Option::<StringOrNumber>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let text = match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        };
        let text = text.trim();
        let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => text.parse::<u32>(),
        };
        parsed
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid integer '{}': {}", text, e)))
    }
}
