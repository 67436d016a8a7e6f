//! Tracing setup: one compact layer to stdout, one plain layer to the daily
//! log file `{log_dir}/weather_etl_YYYYMMDD.log`.

use std::{
    env,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use is_terminal::IsTerminal;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

// ---

/// Path of the log file for `date`.
pub fn log_file_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("weather_etl_{}.log", date.format("%Y%m%d")))
}

/// Initialize the global tracing subscriber.
///
/// - Log level comes from `RUST_LOG` when set, otherwise from
///   `WEATHER_LOG_LEVEL` (default `info`)
/// - Stdout color is controlled by `FORCE_COLOR`:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - The log file is appended to and never colored
///
/// Call once at startup, before any logging macros are used.
pub fn init_tracing(log_dir: &Path) -> Result<PathBuf> {
    // ---
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let log_path = log_file_path(log_dir, Local::now().date_naive());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to WEATHER_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("WEATHER_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_ansi(use_color)
        .compact();

    let file_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(Arc::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(log_path)
}
