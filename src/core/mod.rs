// Core business logic module

pub mod air_monitor;
pub mod config;

// Re-export commonly used items
pub use air_monitor::{CycleState, Engine, Measurement};
pub use config::Config;
