//! BME280 on the local I2C bus, read through the kernel IIO driver.
//!
//! The `bmp280` kernel driver exposes one directory per device under
//! `/sys/bus/iio/devices` with the processed channels
//! `in_temp_input` (m°C), `in_humidityrelative_input` (m%RH) and
//! `in_pressure_input` (kPa).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::core::air_monitor::{Measurement, Provider, ProviderError, Reading};
use crate::core::config::{ProviderKind, SourceConfig};

const IIO_ROOT: &str = "/sys/bus/iio/devices";
const DEFAULT_BUS: u32 = 1;
const DEFAULT_ADDRESS: u32 = 0x77;
const DEVICE_NAMES: [&str; 2] = ["bme280", "bmp280"];

pub struct Bme280Provider {
    iio_root: PathBuf,
    device: Option<PathBuf>,
}

impl Bme280Provider {
    pub fn new() -> Self {
        Self::with_iio_root(IIO_ROOT)
    }

    pub fn with_iio_root(iio_root: impl Into<PathBuf>) -> Self {
        Self {
            iio_root: iio_root.into(),
            device: None,
        }
    }

    pub fn device(&self) -> Option<&Path> {
        self.device.as_deref()
    }

    /// Find the IIO directory of the sensor at `i2c-<bus>/<bus>-<addr>`
    async fn locate(&self, source: &SourceConfig) -> Result<PathBuf, ProviderError> {
        if let Some(path) = &source.device_path {
            tokio::fs::metadata(path).await?;
            return Ok(path.clone());
        }

        let bus = source.i2c_bus.unwrap_or(DEFAULT_BUS);
        let address = source.i2c_address.unwrap_or(DEFAULT_ADDRESS);
        let client = format!("{}-{:04x}", bus, address);

        let mut entries = tokio::fs::read_dir(&self.iio_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Ok(name) = tokio::fs::read_to_string(path.join("name")).await else {
                continue;
            };
            if !DEVICE_NAMES.contains(&name.trim()) {
                continue;
            }

            let resolved = tokio::fs::canonicalize(&path).await.unwrap_or_else(|_| path.clone());
            if resolved
                .components()
                .any(|c| c.as_os_str().to_string_lossy() == client)
            {
                return Ok(path);
            }
        }

        Err(ProviderError::Sensor(format!(
            "no BME280 found at bus {} address 0x{:02x}",
            bus, address
        )))
    }
}

impl Default for Bme280Provider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for Bme280Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bme280
    }

    async fn init(&mut self, source: &SourceConfig) -> Result<(), ProviderError> {
        if self.device.is_some() {
            return Ok(());
        }
        let device = self.locate(source).await?;
        log::debug!("Source '{}': using BME280 at {}", source.id, device.display());
        self.device = Some(device);
        Ok(())
    }

    async fn poll(&mut self, source: &SourceConfig) -> Result<Reading, ProviderError> {
        let device = self.device.as_ref().ok_or(ProviderError::NotInitialized)?;

        let mut reading = Reading::new();
        for &key in &source.keys {
            let (channel, to_unit): (&str, fn(f64) -> f64) = match key {
                Measurement::Temperature => ("in_temp_input", |v| v / 1000.0),
                Measurement::Humidity => ("in_humidityrelative_input", |v| v / 1000.0),
                Measurement::Pressure => ("in_pressure_input", |v| v * 10.0),
                other => {
                    log::error!("Source '{}': unsupported key {}", source.id, other);
                    continue;
                }
            };
            let raw = read_channel(device, channel).await?;
            reading.set(key, to_unit(raw));
        }

        log::debug!("Source '{}': BME280 provided {:?}", source.id, reading);
        Ok(reading)
    }
}

async fn read_channel(device: &Path, channel: &str) -> Result<f64, ProviderError> {
    let text = tokio::fs::read_to_string(device.join(channel)).await?;
    text.trim()
        .parse::<f64>()
        .map_err(|e| ProviderError::Sensor(format!("{}: {}", channel, e)))
}
