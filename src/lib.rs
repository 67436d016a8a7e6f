//! Library half of the `weather-etl` job.
//!
//! Module roles:
//! - `config`   – environment-driven, immutable job configuration
//! - `error`    – the `EtlError` taxonomy shared by every step
//! - `models`   – provider payloads, record types and transforms
//! - `provider` – OpenWeatherMap HTTP client (extract)
//! - `schema`   – idempotent DDL
//! - `store`    – per-operation SQLite access (load and read-back)
//! - `pipeline` – the `WeatherEtl` orchestrator and summary
//! - `demo`, `legacy` – auxiliary jobs sharing the store
//!
//! Sibling modules import shared types through the crate root re-exports
//! below rather than reaching into each other's files.

pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod legacy;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod schema;
pub mod store;

pub use config::Config;
pub use error::EtlError;
pub use models::{CurrentWeatherRecord, ForecastRecord};
pub use pipeline::{PipelineReport, WeatherEtl, WeatherSummary};
