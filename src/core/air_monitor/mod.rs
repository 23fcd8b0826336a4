//! Air monitoring engine.
//!
//! Polls the configured sources one after the other, derives the published
//! service values and the composite air quality index, and samples a
//! decimated weather history.

mod aggregator;
pub mod air_quality;
mod history;
mod journal;
mod orchestrator;
mod provider;
mod reading;
mod scheduler;

pub use aggregator::{aggregate, resolve, Aggregator, CycleValues, ServiceValues};
pub use air_quality::{index_by_name, AirQuality, AirQualityIndex, CommonAirQualityIndex};
pub use history::{HistoryEntry, HistorySampler, HistoryStore, RollingHistory};
pub use journal::Journal;
pub use orchestrator::{CycleState, Orchestrator};
pub use provider::{BoxedProvider, Provider, ProviderError};
pub use reading::{Measurement, Reading, ReadingStore};
pub use scheduler::{Engine, Pipeline};
