//! Periodic driver of the poll, derive and sample pipeline.
//!
//! At most one cycle is in flight. The pipeline sits behind an async mutex and
//! a timer tick that cannot take it immediately is dropped, never queued.

use chrono::Local;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use super::aggregator::{Aggregator, CycleValues};
use super::history::{HistorySampler, HistoryStore, RollingHistory};
use super::journal::Journal;
use super::orchestrator::{CycleState, Orchestrator};
use super::reading::Measurement;
use crate::core::config::{Config, ServiceKind};
use crate::error::Result;
use crate::platform::providers::http_client;

/// Everything a cycle mutates
pub struct Pipeline {
    orchestrator: Orchestrator,
    aggregator: Aggregator,
    sampler: HistorySampler,
    journal: Option<Journal>,
}

impl Pipeline {
    pub fn new(
        orchestrator: Orchestrator,
        aggregator: Aggregator,
        sampler: HistorySampler,
        journal: Option<Journal>,
    ) -> Self {
        Self {
            orchestrator,
            aggregator,
            sampler,
            journal,
        }
    }
}

pub struct Engine {
    pipeline: Arc<Mutex<Pipeline>>,
    history: Arc<dyn HistoryStore>,
    interval: Duration,
    state_tx: watch::Sender<Arc<CycleState>>,
}

impl Engine {
    /// Build the engine with an in-memory rolling history
    pub fn new(config: &Config) -> Result<Self> {
        let history = Arc::new(RollingHistory::with_capacity(config.history_capacity));
        Self::with_history(config, history)
    }

    pub fn with_history(config: &Config, history: Arc<dyn HistoryStore>) -> Result<Self> {
        config.validate()?;

        let client = http_client()?;
        let orchestrator = Orchestrator::from_config(config, &client);
        let aggregator = Aggregator::new(config.services.clone());

        // Only weather services feed the history
        let sampling = config.service(ServiceKind::Temperature).is_some()
            || config.service(ServiceKind::Humidity).is_some();
        let sampler = HistorySampler::new(config.history_frequency(), sampling);

        let journal = config.journal_path().map(Journal::new);
        if let Some(journal) = &journal {
            log::info!("Writing history journal to {}", journal.path().display());
        }

        Ok(Self::from_parts(
            Pipeline::new(orchestrator, aggregator, sampler, journal),
            history,
            config.update_interval(),
        ))
    }

    pub fn from_parts(pipeline: Pipeline, history: Arc<dyn HistoryStore>, interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(Arc::new(CycleState::default()));
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            history,
            interval,
            state_tx,
        }
    }

    /// State of the last completed cycle
    pub fn current_values(&self) -> Arc<CycleState> {
        self.state_tx.borrow().clone()
    }

    /// Receiver notified after every completed cycle
    pub fn subscribe(&self) -> watch::Receiver<Arc<CycleState>> {
        self.state_tx.subscribe()
    }

    /// Number of completed cycles
    pub fn cycles(&self) -> u64 {
        self.state_tx.borrow().cycle
    }

    /// Initialize all sources and run the first update, as one busy period
    pub async fn startup(&self) -> Arc<CycleState> {
        let guard = self.pipeline.clone().lock_owned().await;
        self.startup_locked(guard).await
    }

    /// One scheduled update. Returns `None` when a cycle is still running.
    pub async fn tick(&self) -> Option<Arc<CycleState>> {
        let Ok(mut pipeline) = self.pipeline.try_lock() else {
            log::debug!("Update still in progress, skipping tick");
            return None;
        };
        Some(self.run_locked(&mut pipeline).await)
    }

    /// Start up, then tick every interval until `shutdown` resolves.
    pub async fn start<F>(self: Arc<Self>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();

        // Taken before the timer starts so ticks during init are dropped
        let guard = self.pipeline.clone().lock_owned().await;
        let engine = self.clone();
        tasks.spawn(async move {
            engine.startup_locked(guard).await;
        });

        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Stopping updates");
                    break;
                }
                _ = interval.tick() => {
                    let engine = self.clone();
                    tasks.spawn(async move {
                        engine.tick().await;
                    });
                }
                Some(res) = tasks.join_next() => {
                    if let Err(e) = res {
                        log::error!("Update task failed: {}", e);
                    }
                }
            }
        }

        tasks.shutdown().await;
    }

    async fn startup_locked(&self, mut pipeline: OwnedMutexGuard<Pipeline>) -> Arc<CycleState> {
        log::info!("Initializing sources...");
        pipeline.orchestrator.init_all().await;
        self.run_locked(&mut pipeline).await
    }

    async fn run_locked(&self, pipeline: &mut Pipeline) -> Arc<CycleState> {
        let mut state = pipeline.orchestrator.run_cycle().await;
        state.values = pipeline
            .aggregator
            .derive(pipeline.orchestrator.store(), state.error);
        log_values(&state);

        if let Some(entry) = pipeline.sampler.maybe_sample(&state.values, state.timestamp) {
            log::debug!("Recording history entry at {}", entry.time);
            self.history.add_entry(entry);

            if let Some(journal) = &pipeline.journal {
                if let Err(e) = journal.append(&state.values, Local::now()).await {
                    log::error!("{}", e);
                }
            }
        }

        let state = Arc::new(state);
        self.state_tx.send_replace(state.clone());
        state
    }
}

fn log_values(state: &CycleState) {
    if state.error {
        log::warn!("Cycle {} completed with errors: {:?}", state.cycle, state.failed_sources);
    }

    let values: &CycleValues = &state.values;
    let mut parts = Vec::new();
    for m in Measurement::ALL {
        if let Some(v) = values.value(m) {
            parts.push(format!("{}={}{}", m, v, m.unit()));
        }
    }
    if let Some(quality) = values.air_quality() {
        parts.push(format!("air quality {}", quality.stars()));
    }

    if parts.is_empty() {
        log::info!("Cycle {}: no values", state.cycle);
    } else {
        log::info!("Cycle {}: {}", state.cycle, parts.join(", "));
    }
}
