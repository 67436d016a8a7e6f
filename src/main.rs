//! Application entry point for the `weather-etl` job.
//!
//! This binary orchestrates the startup sequence before handing off to the
//! selected subcommand:
//! - Loading `.env` into the process environment
//! - Initializing structured logging to stdout and the daily log file
//! - Parsing the command line and dispatching to `cli`
//!
//! # Environment Variables
//! - `OPENWEATHER_API_KEY` (**required** for weather commands)
//! - `WEATHER_CITY`, `WEATHER_COUNTRY`, `WEATHER_DB_PATH`, `OPENWEATHER_BASE_URL`
//! - `WEATHER_LOG_DIR` (optional) – log directory (default: `logs`)
//! - `WEATHER_LOG_LEVEL` (optional) – log verbosity (default: `info`)
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;

use weather_etl::{cli::Cli, config, logging};

// ---

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // ---
    dotenv().ok();
    let cli = Cli::parse();

    let log_path = logging::init_tracing(&config::log_dir_from_env())?;
    tracing::debug!("Logging to {}", log_path.display());

    Ok(cli.run().await)
}
