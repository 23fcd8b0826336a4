use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::aggregator::CycleValues;
use super::reading::Measurement;

/// One sample a minute for a year
pub const DEFAULT_HISTORY_CAPACITY: usize = 525_600;

/// One decimated weather sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: i64, // Unix timestamp
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

/// Destination of history samples
pub trait HistoryStore: Send + Sync {
    fn add_entry(&self, entry: HistoryEntry);
}

/// Bounded in-memory history, oldest entries are dropped first
#[derive(Debug)]
pub struct RollingHistory {
    capacity: usize,
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl RollingHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<HistoryEntry> {
        self.entries.lock().back().cloned()
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for RollingHistory {
    fn add_entry(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

/// Emits one entry every `frequency` cycles
#[derive(Debug, Clone)]
pub struct HistorySampler {
    frequency: u64,
    counter: u64,
    enabled: bool,
}

impl HistorySampler {
    pub fn new(frequency: u64, enabled: bool) -> Self {
        Self {
            frequency: frequency.max(1),
            counter: 0,
            enabled,
        }
    }

    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    pub fn maybe_sample(&mut self, values: &CycleValues, time: i64) -> Option<HistoryEntry> {
        if !self.enabled {
            return None;
        }

        self.counter += 1;
        if self.counter < self.frequency {
            return None;
        }
        self.counter = 0;

        Some(HistoryEntry {
            time,
            temperature: values.value(Measurement::Temperature),
            pressure: values.value(Measurement::Pressure),
            humidity: values.value(Measurement::Humidity),
        })
    }
}
