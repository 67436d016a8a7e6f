//! Demo job: loads fabricated weather rows into a separate demo store so the
//! pipeline can be tried without an API key.

use chrono::{NaiveDateTime, Timelike};
use tracing::info;

use crate::{schema::TableSet, store::Store, CurrentWeatherRecord, EtlError, ForecastRecord};

pub const DEMO_DB_PATH: &str = "data/demo_weather.db";
pub const DEMO_FORECAST_SLOTS: u32 = 5;

const CONDITIONS: [(&str, &str); 5] = [
    ("Clear", "clear sky"),
    ("Clouds", "few clouds"),
    ("Rain", "light rain"),
    ("Clear", "clear sky"),
    ("Clouds", "scattered clouds"),
];

/// Row counts after a demo load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub current_count: i64,
    pub forecast_count: i64,
}

/// What `demo --show` prints.
#[derive(Debug, Default)]
pub struct DemoContents {
    pub current: Vec<CurrentWeatherRecord>,
    pub forecast: Vec<ForecastRecord>,
}

pub fn sample_current(now: NaiveDateTime) -> CurrentWeatherRecord {
    let today = now.date();
    CurrentWeatherRecord {
        timestamp: now,
        city: "Demo City".to_string(),
        country: "US".to_string(),
        temperature: 22.5,
        feels_like: 24.1,
        humidity: 65,
        pressure: 1013.25,
        weather_main: "Clear".to_string(),
        weather_description: "clear sky".to_string(),
        wind_speed: 3.2,
        wind_direction: 180.0,
        cloudiness: 10,
        visibility: 10.0,
        sunrise: today.and_hms_opt(6, 30, 0).unwrap_or(now),
        sunset: today.and_hms_opt(19, 45, 0).unwrap_or(now),
    }
}

/// Five slots starting at 06:00 today, three hours apart.
pub fn sample_forecast(now: NaiveDateTime) -> Vec<ForecastRecord> {
    (0..DEMO_FORECAST_SLOTS)
        .map(|i| {
            let step = f64::from(i);
            let (main, description) = CONDITIONS[i as usize];
            ForecastRecord {
                forecast_timestamp: now.with_hour(6 + i * 3).unwrap_or(now),
                city: "Demo City".to_string(),
                country: "US".to_string(),
                temperature: 20.0 + step * 2.0,
                feels_like: 20.0 + step * 2.0 + 1.5,
                humidity: 60 + i64::from(i) * 5,
                pressure: 1010.0 + step,
                weather_main: main.to_string(),
                weather_description: description.to_string(),
                wind_speed: 2.0 + step * 0.5,
                wind_direction: 180.0 + step * 30.0,
                cloudiness: 10 + i64::from(i) * 20,
                visibility: 10.0 - step * 0.5,
                precipitation_probability: step * 20.0,
            }
        })
        .collect()
}

/// Create the demo tables and append one sample current row plus the
/// sample forecast slots.
pub async fn run_demo(store: &Store, now: NaiveDateTime) -> Result<DemoReport, EtlError> {
    // ---
    let tables = TableSet::DEMO;
    let current = sample_current(now);
    let forecast = sample_forecast(now);

    info!(
        "Demo extract: 1 current record, {} forecast record(s)",
        forecast.len()
    );

    store.create_tables(tables).await?;
    store.load(std::slice::from_ref(&current), tables.current).await?;
    store.load(&forecast, tables.forecast).await?;

    let report = DemoReport {
        current_count: store.count(tables.current).await?,
        forecast_count: store.count(tables.forecast).await?,
    };

    info!(
        "Demo load complete: {} current row(s), {} forecast row(s) in {}",
        report.current_count,
        report.forecast_count,
        store.path().display()
    );
    Ok(report)
}

/// Up to five recent current rows and the first five forecast slots, or
/// `None` when the demo store has never been created.
pub async fn show_contents(store: &Store) -> Result<Option<DemoContents>, EtlError> {
    // ---
    if !store.exists() {
        return Ok(None);
    }

    let tables = TableSet::DEMO;
    Ok(Some(DemoContents {
        current: store.recent_current(tables.current, 5).await?,
        forecast: store.earliest_forecast(tables.forecast, 5).await?,
    }))
}
