//! Long-running update loop.

use anyhow::{Context, Result};
use clap::ArgMatches;
use std::sync::Arc;

use crate::core::Engine;
use crate::ui::formatters;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = super::load_config(matches)?;

    log::info!(
        "Starting '{}' with {} source(s), updating every {}s",
        config.name,
        config.sources.len(),
        config.update_interval_seconds
    );

    let runtime = super::runtime()?;
    runtime.block_on(async move {
        let engine = Arc::new(Engine::new(&config).context("Failed to build engine")?);

        let mut updates = engine.subscribe();
        let printer = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let state = updates.borrow_and_update().clone();
                println!("{}", formatters::format_cycle_line(&state));
            }
        });

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        engine.start(shutdown).await;
        printer.abort();
        anyhow::Ok(())
    })
}
