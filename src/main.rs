use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use airq::commands;

fn main() -> Result<()> {
    let matches = Command::new("airq")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Polls air quality and weather sources and publishes aggregated values")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Configuration file (defaults to the user config directory)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every source poll")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("run")
                .about("Start the update loop and log values until Ctrl-C"),
        )
        .subcommand(
            Command::new("once")
                .about("Initialize all sources, run one update and print the values")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the cycle state as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Validate the configuration and show sources and services"),
        )
        .subcommand(Command::new("version").about("Shows version information"))
        .get_matches();

    airq::init_logging(matches.get_flag("verbose"));

    if matches.get_flag("version") {
        return commands::version();
    }

    match matches.subcommand() {
        Some(("run", sub_matches)) => commands::run(sub_matches),
        Some(("once", sub_matches)) => commands::once(sub_matches),
        Some(("check", sub_matches)) => commands::check(sub_matches),
        Some(("version", _)) => commands::version(),
        _ => {
            println!("Welcome to airq!");
            println!("Use 'airq --help' for more information.");
            Ok(())
        }
    }
}
