use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::Engine;
use crate::ui::formatters;

/// Initialize all sources, run the startup cycle and print it
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = super::load_config(matches)?;
    let json_output = matches.get_flag("json");

    let runtime = super::runtime()?;
    let state = runtime.block_on(async {
        let engine = Engine::new(&config).context("Failed to build engine")?;
        anyhow::Ok(engine.startup().await)
    })?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&*state)?);
    } else {
        formatters::print_cycle(&state);
    }

    Ok(())
}
