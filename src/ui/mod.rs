// UI and formatting module

pub mod formatters;

// Re-export commonly used items for cleaner imports
pub use formatters::{format_air_quality, format_cycle_line, format_timestamp, format_value, print_cycle};
