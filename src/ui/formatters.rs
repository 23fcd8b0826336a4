use chrono::{Local, TimeZone};
use colored::{ColoredString, Colorize};

use crate::core::air_monitor::{AirQuality, CycleState, Measurement};

/// Format a measurement with its unit, `-` when absent
pub fn format_value(measurement: Measurement, value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1} {}", v, measurement.unit()),
        None => "-".to_string(),
    }
}

/// Colored label plus star rating
pub fn format_air_quality(quality: AirQuality) -> ColoredString {
    let label = format!("{} {}", quality, quality.stars());
    match quality {
        AirQuality::Unknown => label.dimmed(),
        AirQuality::Excellent | AirQuality::Good => label.green(),
        AirQuality::Fair => label.yellow(),
        AirQuality::Inferior | AirQuality::Poor => label.red(),
    }
}

/// Format a Unix timestamp as local time (YYYY-MM-DD HH:MM:SS)
pub fn format_timestamp(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One-line summary used by the update loop
pub fn format_cycle_line(state: &CycleState) -> String {
    let mut parts = vec![format_timestamp(state.timestamp)];
    for m in Measurement::ALL {
        if let Some(v) = state.values.value(m) {
            parts.push(format!("{} {}", m, format_value(m, Some(v))));
        }
    }
    if let Some(quality) = state.values.air_quality() {
        parts.push(format_air_quality(quality).to_string());
    }
    if state.error {
        parts.push("fault".red().to_string());
    }
    parts.join("  ")
}

/// Print every service of a cycle
pub fn print_cycle(state: &CycleState) {
    println!(
        "{} cycle {} at {}",
        "airq".bold(),
        state.cycle,
        format_timestamp(state.timestamp)
    );

    if state.values.is_empty() {
        println!("  {}", "no services configured".dimmed());
    }

    for (kind, service) in &state.values.services {
        let status = if service.fault {
            "fault".red()
        } else {
            "ok".green()
        };
        let title = if service.name.is_empty() {
            kind.to_string()
        } else {
            format!("{} ({})", kind, service.name)
        };
        println!("\n  {} [{}]", title.cyan(), status);

        for (measurement, value) in &service.values {
            println!("    {:<12} {}", measurement.to_string(), format_value(*measurement, *value));
        }
        if let Some(quality) = service.air_quality {
            println!("    {:<12} {}", "index", format_air_quality(quality));
        }
    }

    if !state.failed_sources.is_empty() {
        println!("\n  {} {}", "failed:".red(), state.failed_sources.join(", "));
    }
}
