//! Command-line surface for the `weather-etl` binary.

use std::{path::PathBuf, process::ExitCode};

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::{
    config, demo, legacy,
    pipeline::{WeatherEtl, DEFAULT_FORECAST_DAYS},
    schema::TableSet,
    store::Store,
    Config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-etl", version, about = "OpenWeatherMap ETL job")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, transform and store current weather (and forecast by default).
    Run {
        /// Only collect current conditions.
        #[arg(long)]
        skip_forecast: bool,

        /// Forecast horizon to request; the provider returns its full window.
        #[arg(long, default_value_t = DEFAULT_FORECAST_DAYS)]
        days: u32,
    },

    /// Print the latest stored observation and today's forecast.
    Summary,

    /// Run the weather pipeline, then the legacy CSV job.
    Both {
        /// CSV file for the legacy job.
        #[arg(long, default_value = legacy::DEFAULT_INPUT)]
        input: PathBuf,
    },

    /// Load a CSV file into SQL, keeping rows whose "0" column exceeds 18.
    Legacy {
        /// CSV file to read.
        #[arg(long, default_value = legacy::DEFAULT_INPUT)]
        input: PathBuf,

        /// Destination table.
        #[arg(long, default_value = legacy::DEFAULT_TABLE)]
        table: String,
    },

    /// Scheduled daily run: pipeline with forecast, then summary.
    ///
    /// Exits 1 when any step fails, soft failures included. Other commands
    /// only log such failures and exit 0.
    Daily,

    /// Load fabricated sample data into the demo store.
    Demo {
        /// Show the demo store contents instead of loading.
        #[arg(long)]
        show: bool,
    },
}

impl Cli {
    /// Execute the selected command.
    ///
    /// Failures are logged. Only `daily` turns them into exit code 1.
    pub async fn run(self) -> ExitCode {
        let success = self.command.execute().await;
        exit_code(&self.command, success)
    }
}

impl Command {
    /// Run the command; `true` when every step succeeded.
    async fn execute(&self) -> bool {
        match self {
            Command::Run {
                skip_forecast,
                days,
            } => {
                let Some(etl) = build_etl() else {
                    return false;
                };
                let etl = etl.with_forecast_days(*days);
                let report = etl.run_pipeline(!*skip_forecast).await;
                print_summary(&etl).await;
                report.is_success()
            }
            Command::Summary => {
                let Some(etl) = build_etl() else {
                    return false;
                };
                print_summary(&etl).await;
                true
            }
            Command::Both { input } => {
                let Some(etl) = build_etl() else {
                    return false;
                };
                let report = etl.run_pipeline(true).await;
                let legacy_ok = run_legacy_job(input, etl.store(), legacy::DEFAULT_TABLE).await;
                print_summary(&etl).await;
                report.is_success() && legacy_ok
            }
            Command::Legacy { input, table } => {
                let store = Store::new(config::db_path_from_env());
                run_legacy_job(input, &store, table).await
            }
            Command::Daily => run_daily().await,
            Command::Demo { show } => {
                let store = Store::new(demo::DEMO_DB_PATH);
                let result = if *show {
                    show_demo(&store).await
                } else {
                    run_demo(&store).await
                };
                match result {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Demo job failed: {:#}", e);
                        false
                    }
                }
            }
        }
    }
}

/// `daily` exits 1 on any failure; every other command exits 0 once it ran.
fn exit_code(command: &Command, success: bool) -> ExitCode {
    match command {
        Command::Daily if !success => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn build_etl() -> Option<WeatherEtl> {
    let built = config::load_from_env().and_then(|cfg: Config| {
        cfg.log_config();
        WeatherEtl::new(cfg)
    });

    match built {
        Ok(etl) => Some(etl),
        Err(e) => {
            error!("Failed to configure weather ETL: {}", e);
            None
        }
    }
}

async fn print_summary(etl: &WeatherEtl) {
    match etl.summarize().await {
        Ok(summary) if summary.is_empty() => println!("No weather data stored yet."),
        Ok(summary) => print!("{summary}"),
        Err(e) => error!("Failed to summarize stored weather: {}", e),
    }
}

async fn run_legacy_job(input: &std::path::Path, store: &Store, table: &str) -> bool {
    match legacy::run_legacy(input, store, table).await {
        Ok(report) => {
            info!(
                "Legacy CSV job: {} extracted, {} kept, {} loaded into {}",
                report.extracted, report.kept, report.loaded, table
            );
            true
        }
        Err(e) => {
            error!("Legacy CSV job failed: {}", e);
            false
        }
    }
}

/// Daily scheduler entry point; `true` means exit code 0.
async fn run_daily() -> bool {
    // ---
    println!(
        "=== Daily Weather ETL Scheduler - {} ===",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    info!("Starting daily weather data collection");

    let success = match build_etl() {
        Some(etl) => {
            let report = etl.run_pipeline(true).await;
            if report.is_success() {
                info!("Daily weather data collection completed successfully");
            }
            print_summary(&etl).await;
            report.is_success()
        }
        None => false,
    };

    if success {
        println!("Daily weather data collection completed successfully!");
    } else {
        println!("Daily weather data collection failed!");
    }
    success
}

async fn run_demo(store: &Store) -> anyhow::Result<()> {
    // ---
    println!("=== Weather ETL Demo Pipeline ===");

    let now = Local::now().naive_local();
    let current = demo::sample_current(now);
    let forecast = demo::sample_forecast(now);

    println!("\n1. EXTRACT - Sample weather data created");
    println!("   Current weather: 1 record");
    println!("   Forecast data: {} records", forecast.len());

    println!("\n2. TRANSFORM - Data structure:");
    println!(
        "   Current: {} | {:.1}°C | {} | {}% humidity",
        current.city, current.temperature, current.weather_description, current.humidity
    );
    for slot in forecast.iter().take(3) {
        println!(
            "   Forecast: {} | {:.1}°C | {}",
            slot.forecast_timestamp.format("%Y-%m-%d %H:%M"),
            slot.temperature,
            slot.weather_description
        );
    }

    let report = demo::run_demo(store, now).await?;

    println!("\n3. LOAD - Data successfully loaded to {}", store.path().display());
    println!(
        "   Tables: {}, {}",
        TableSet::DEMO.current,
        TableSet::DEMO.forecast
    );
    println!("   Records in {}: {}", TableSet::DEMO.current, report.current_count);
    println!("   Records in {}: {}", TableSet::DEMO.forecast, report.forecast_count);

    println!("\n=== Demo Pipeline Completed Successfully ===");
    println!("Next: set OPENWEATHER_API_KEY in .env and run `weather-etl run`.");
    Ok(())
}

async fn show_demo(store: &Store) -> anyhow::Result<()> {
    // ---
    let Some(contents) = demo::show_contents(store).await? else {
        println!("Demo database not found. Run `weather-etl demo` first.");
        return Ok(());
    };

    println!("=== Demo Database Contents ===");

    if !contents.current.is_empty() {
        println!("\nCurrent Weather Records:");
        for row in &contents.current {
            println!(
                "  {} | {} | {:.1}°C | {}",
                row.timestamp.format("%Y-%m-%d %H:%M:%S"),
                row.city,
                row.temperature,
                row.weather_description
            );
        }
    }

    if !contents.forecast.is_empty() {
        println!("\nForecast Records:");
        for row in &contents.forecast {
            println!(
                "  {} | {:.1}°C | {}",
                row.forecast_timestamp.format("%Y-%m-%d %H:%M"),
                row.temperature,
                row.weather_description
            );
        }
    }

    Ok(())
}
