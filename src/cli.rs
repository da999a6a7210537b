use clap::Parser;
use std::path::PathBuf;

/// Validator liveness watchdog.
#[derive(Debug, Parser)]
#[command(version, about)]
pub(crate) struct Cli {
    /// Path to the config file.
    #[arg(short, long, env = "SIGNWATCH_CONFIG", default_value = "./config.json")]
    pub(crate) config: PathBuf,
    /// Write a sample config to the config path and exit.
    #[arg(long)]
    pub(crate) init: bool,
}
