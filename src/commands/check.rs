use anyhow::Result;
use clap::ArgMatches;
use colored::Colorize;

use crate::core::air_monitor::index_by_name;
use crate::core::air_monitor::air_quality::DEFAULT_INDEX;
use crate::core::config::{AggregateFunction, Config, FieldBinding, ProviderKind, ServiceKind};

/// Validate the configuration and print what the engine would run
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = super::load_config(matches)?;

    println!("{} {}", "Configuration".bold(), config.name.cyan());
    println!(
        "  update every {}s, history every {}s (1 sample per {} updates)",
        config.update_interval_seconds,
        config.update_history_seconds,
        config.history_frequency()
    );
    match config.journal_path() {
        Some(path) => println!("  journal: {}", path.display()),
        None => println!("  journal: {}", "disabled".dimmed()),
    }
    if let Some(timeout) = config.poll_timeout_seconds {
        println!("  poll timeout: {}s", timeout);
    }

    println!("\n{}", "Sources".bold());
    for source in &config.sources {
        let keys: Vec<String> = source.keys.iter().map(|k| k.to_string()).collect();
        let provider = match &source.provider {
            ProviderKind::Unknown(_) => source.provider.to_string().red(),
            known => known.to_string().normal(),
        };
        println!("  {:<16} {:<20} {}", source.id.cyan(), provider, keys.join(", "));
    }

    println!("\n{}", "Services".bold());
    for (kind, spec) in &config.services {
        println!("  {} {}", kind.to_string().cyan(), spec.name.dimmed());
        for (measurement, binding) in &spec.fields {
            println!("    {:<12} <- {}", measurement.to_string(), describe(binding));
        }
    }

    let warnings = collect_warnings(&config);
    if warnings.is_empty() {
        println!("\n{} Configuration is valid", "✓".green());
    } else {
        println!();
        for warning in &warnings {
            println!("{} {}", "⚠".yellow(), warning);
        }
    }

    Ok(())
}

fn describe(binding: &FieldBinding) -> String {
    match binding {
        FieldBinding::Direct(id) => id.clone(),
        FieldBinding::Aggregate { sources, aggregate } => {
            format!("{}({})", aggregate, sources.join(", "))
        }
    }
}

/// Problems that do not stop the engine but degrade some values
pub fn collect_warnings(config: &Config) -> Vec<String> {
    let mut warnings = Vec::new();

    for source in &config.sources {
        if let ProviderKind::Unknown(name) = &source.provider {
            warnings.push(format!(
                "source '{}' uses unknown provider '{}' and will be skipped",
                source.id, name
            ));
        }
    }

    for (kind, spec) in &config.services {
        for (measurement, binding) in &spec.fields {
            if let FieldBinding::Aggregate {
                aggregate: AggregateFunction::Unknown(name),
                ..
            } = binding
            {
                warnings.push(format!(
                    "service '{}' field '{}' uses unknown aggregate '{}'",
                    kind, measurement, name
                ));
            }
        }

        if *kind == ServiceKind::AirQuality {
            let name = spec.aqi.as_deref().unwrap_or(DEFAULT_INDEX);
            if let Err(e) = index_by_name(name) {
                warnings.push(e.to_string());
            }
        }
    }

    warnings
}
