// Command handlers module
pub mod check;
pub mod once;
pub mod run;
pub mod version;

// Re-exports for cleaner imports
pub use check::execute as check;
pub use once::execute as once;
pub use run::execute as run;
pub use version::execute as version;

use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::Path;

use crate::core::Config;

/// Load the configuration named by `--config`, or the default one
fn load_config(matches: &ArgMatches) -> Result<Config> {
    let path = matches.get_one::<String>("config").map(Path::new);
    Config::load(path)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("airq-worker")
        .build()
        .context("Failed to start async runtime")
}
