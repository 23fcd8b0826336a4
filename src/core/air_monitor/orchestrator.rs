//! Sequential init/poll of every configured source.
//!
//! Sources are processed one after the other, in configuration order. Shared
//! transports (an I2C bus, rate limited public APIs) never see more than one
//! request from this engine at a time.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::aggregator::CycleValues;
use super::provider::{BoxedProvider, ProviderError};
use super::reading::{Measurement, ReadingStore};
use crate::core::config::{Config, SourceConfig};
use crate::error::AirqError;
use crate::platform::providers::create_provider;

/// Outcome of one scheduler tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleState {
    /// 1-based cycle number, the startup pass is cycle 1
    pub cycle: u64,
    pub timestamp: i64, // Unix timestamp
    /// True if any source failed to initialize or poll during this cycle
    pub error: bool,
    pub failed_sources: Vec<String>,
    pub values: CycleValues,
}

struct SourceSlot {
    config: SourceConfig,
    provider: Option<BoxedProvider>,
}

pub struct Orchestrator {
    slots: Vec<SourceSlot>,
    store: ReadingStore,
    poll_timeout: Option<Duration>,
    cycles: u64,
    init_failed: bool,
}

impl Orchestrator {
    /// Build adapters for every source of the configuration.
    ///
    /// Sources with an unknown provider are reported and kept without adapter;
    /// their reading stays empty.
    pub fn from_config(config: &Config, client: &reqwest::Client) -> Self {
        let sources = config
            .sources
            .iter()
            .map(|source| {
                let provider = match create_provider(source, client) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        log::error!("{}", e);
                        None
                    }
                };
                (source.clone(), provider)
            })
            .collect();

        Self::new(sources, config.poll_timeout())
    }

    pub fn new(sources: Vec<(SourceConfig, Option<BoxedProvider>)>, poll_timeout: Option<Duration>) -> Self {
        let store = ReadingStore::with_sources(sources.iter().map(|(s, _)| s.id.as_str()));
        let slots = sources
            .into_iter()
            .map(|(config, provider)| SourceSlot { config, provider })
            .collect();

        Self {
            slots,
            store,
            poll_timeout,
            cycles: 0,
            init_failed: false,
        }
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Initialize every adapter once. Failures are logged and counted; the
    /// next cycle reports them through its error flag.
    pub async fn init_all(&mut self) -> usize {
        log::debug!("Initializing all sources...");
        let mut failures = 0;

        for slot in &mut self.slots {
            let Some(provider) = slot.provider.as_mut() else {
                continue;
            };
            log::debug!("Initializing source '{}' ({})", slot.config.id, slot.config.provider);

            let result = with_timeout(self.poll_timeout, provider.init(&slot.config)).await;
            if let Err(e) = result {
                log::error!("{}", AirqError::adapter_init(&slot.config.id, e));
                failures += 1;
            }
        }

        if failures > 0 {
            self.init_failed = true;
        } else {
            log::debug!("Successfully initialized all sources.");
        }
        failures
    }

    /// Poll every source once and fold the results into the reading store.
    ///
    /// Never fails: a source error is logged, flagged on the returned state and
    /// the loop moves on to the next source.
    pub async fn run_cycle(&mut self) -> CycleState {
        self.cycles += 1;
        let mut state = CycleState {
            cycle: self.cycles,
            error: std::mem::take(&mut self.init_failed),
            ..Default::default()
        };

        log::debug!("Updating data (cycle {})...", self.cycles);

        for slot in &mut self.slots {
            let Some(provider) = slot.provider.as_mut() else {
                log::debug!("Skipping source '{}' without adapter", slot.config.id);
                continue;
            };
            log::debug!("Polling source '{}'", slot.config.id);

            match with_timeout(self.poll_timeout, provider.poll(&slot.config)).await {
                Ok(mut partial) => {
                    let missing: Vec<Measurement> = slot
                        .config
                        .keys
                        .iter()
                        .copied()
                        .filter(|k| !partial.contains(*k))
                        .collect();
                    if !missing.is_empty() {
                        log::debug!("Source '{}' did not resolve {:?}", slot.config.id, missing);
                    }

                    partial.apply_offsets(&slot.config.offsets);
                    self.store.entry(&slot.config.id).merge(&partial);
                }
                Err(e) => {
                    log::error!("{}", AirqError::adapter_poll(&slot.config.id, e));
                    state.error = true;
                    state.failed_sources.push(slot.config.id.clone());
                }
            }
        }

        state.timestamp = chrono::Utc::now().timestamp();
        state
    }
}

async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(ProviderError::Timeout(limit.as_secs()))),
        None => fut.await,
    }
}
