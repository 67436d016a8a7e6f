//! The `WeatherEtl` component: extract → transform → load orchestration.
//!
//! Individual operations return explicit results. [`WeatherEtl::run_pipeline`]
//! owns the policy: soft failures are logged and skipped, a configuration
//! error stops the run, and nothing escapes as a panic or an `Err`.

use std::fmt;

use chrono::Local;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    models,
    provider::{Endpoint, OpenWeatherClient},
    schema::TableSet,
    store::{Record, Store},
    Config, CurrentWeatherRecord, EtlError, ForecastRecord,
};

// ---

/// Forecast horizon of the free provider tier.
pub const DEFAULT_FORECAST_DAYS: u32 = 5;

/// A failure recorded while running the pipeline.
#[derive(Debug)]
pub struct StepFailure {
    pub step: &'static str,
    pub error: EtlError,
}

/// Outcome of one [`WeatherEtl::run_pipeline`] call.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub current_rows: usize,
    pub forecast_rows: usize,
    pub failures: Vec<StepFailure>,
    /// Set when a configuration error stopped the run early.
    pub aborted: bool,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: &'static str, error: EtlError) {
        if error.is_fatal() {
            error!("{} aborted the pipeline: {}", step, error);
            self.aborted = true;
        } else {
            error!("{} failed, continuing: {}", step, error);
        }
        self.failures.push(StepFailure { step, error });
    }
}

/// Latest stored observation plus today's forecast slots.
#[derive(Debug, Default)]
pub struct WeatherSummary {
    pub latest: Option<CurrentWeatherRecord>,
    pub today_forecast: Vec<ForecastRecord>,
}

impl WeatherSummary {
    pub fn is_empty(&self) -> bool {
        self.latest.is_none() && self.today_forecast.is_empty()
    }
}

impl fmt::Display for WeatherSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cur) = &self.latest {
            writeln!(f, "=== Latest Weather: {}, {} ===", cur.city, cur.country)?;
            writeln!(f, "Recorded:    {}", cur.timestamp.format("%Y-%m-%d %H:%M:%S"))?;
            writeln!(
                f,
                "Temperature: {:.1}°C (feels like {:.1}°C)",
                cur.temperature, cur.feels_like
            )?;
            writeln!(f, "Conditions:  {} ({})", cur.weather_main, cur.weather_description)?;
            writeln!(f, "Humidity:    {}%", cur.humidity)?;
            writeln!(f, "Pressure:    {:.0} hPa", cur.pressure)?;
            writeln!(
                f,
                "Wind:        {:.1} m/s at {:.0}°",
                cur.wind_speed, cur.wind_direction
            )?;
            writeln!(f, "Cloudiness:  {}%", cur.cloudiness)?;
            writeln!(f, "Visibility:  {:.1} km", cur.visibility)?;
            writeln!(
                f,
                "Sun:         rises {} / sets {}",
                cur.sunrise.format("%H:%M"),
                cur.sunset.format("%H:%M")
            )?;
        }

        if !self.today_forecast.is_empty() {
            writeln!(f, "=== Today's Forecast ({} slots) ===", self.today_forecast.len())?;
            for slot in &self.today_forecast {
                writeln!(
                    f,
                    "  {}  {:>5.1}°C  {:<20} {:>3.0}% precip",
                    slot.forecast_timestamp.format("%H:%M"),
                    slot.temperature,
                    slot.weather_description,
                    slot.precipitation_probability
                )?;
            }
        }

        Ok(())
    }
}

/// Weather extract-transform-load job bound to one configuration.
#[derive(Debug, Clone)]
pub struct WeatherEtl {
    config: Config,
    client: OpenWeatherClient,
    store: Store,
    tables: TableSet,
    forecast_days: u32,
}

impl WeatherEtl {
    /// Build the job; fails with `ConfigMissing` when the API key is blank.
    pub fn new(config: Config) -> Result<Self, EtlError> {
        // ---
        if config.api_key.trim().is_empty() {
            return Err(EtlError::ConfigMissing(
                "OPENWEATHER_API_KEY must be set in .env or environment".into(),
            ));
        }

        let client = OpenWeatherClient::new(&config)?;
        let store = Store::new(config.db_path.clone());

        Ok(Self {
            config,
            client,
            store,
            tables: TableSet::LIVE,
            forecast_days: DEFAULT_FORECAST_DAYS,
        })
    }

    /// Override the forecast horizon that `run_pipeline` requests.
    pub fn with_forecast_days(mut self, days: u32) -> Self {
        self.forecast_days = days;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn tables(&self) -> TableSet {
        self.tables
    }

    pub async fn create_tables(&self) -> Result<(), EtlError> {
        self.store.create_tables(self.tables).await
    }

    /// Fetch current conditions for the configured city.
    pub async fn extract_current(&self) -> Result<Value, EtlError> {
        // ---
        info!("Extracting current weather for {}", self.config.location_query());
        self.client.fetch(Endpoint::Current).await
    }

    /// Fetch the 3-hour forecast. `days` is informational only: the provider
    /// always returns its full window and every slot is kept.
    pub async fn extract_forecast(&self, days: u32) -> Result<Value, EtlError> {
        // ---
        info!(
            "Extracting {}-day forecast for {}",
            days,
            self.config.location_query()
        );
        self.client.fetch(Endpoint::Forecast).await
    }

    /// `None` in, `None` out; a malformed payload is a `ShapeMismatch`.
    pub fn transform_current(
        &self,
        raw: Option<&Value>,
    ) -> Result<Option<CurrentWeatherRecord>, EtlError> {
        // ---
        let Some(raw) = raw else {
            warn!("No current weather payload to transform");
            return Ok(None);
        };

        let record = models::transform_current(raw)?;
        info!(
            "Transformed current weather: {}, {} {:.1}°C",
            record.city, record.country, record.temperature
        );
        Ok(Some(record))
    }

    /// `None` in, `None` out; otherwise one record per slot, in order.
    pub fn transform_forecast(
        &self,
        raw: Option<&Value>,
    ) -> Result<Option<Vec<ForecastRecord>>, EtlError> {
        // ---
        let Some(raw) = raw else {
            warn!("No forecast payload to transform");
            return Ok(None);
        };

        let records = models::transform_forecast(raw)?;
        info!("Transformed {} forecast slot(s)", records.len());
        Ok(Some(records))
    }

    /// Append records to `table`; an empty set is a logged no-op.
    pub async fn load<R: Record>(&self, records: &[R], table: &str) -> Result<usize, EtlError> {
        self.store.load(records, table).await
    }

    /// Run create → current → (forecast) and report what happened.
    ///
    /// Never fails: every error ends up in the returned report and the log.
    pub async fn run_pipeline(&self, include_forecast: bool) -> PipelineReport {
        // ---
        info!(
            "Starting weather ETL pipeline for {} (forecast: {})",
            self.config.location_query(),
            include_forecast
        );

        let mut report = PipelineReport::default();

        if let Err(e) = self.create_tables().await {
            report.record("create_tables", e);
        }

        match self.current_step().await {
            Ok(n) => report.current_rows = n,
            Err(e) => report.record("current", e),
        }

        if include_forecast && !report.aborted {
            match self.forecast_step().await {
                Ok(n) => report.forecast_rows = n,
                Err(e) => report.record("forecast", e),
            }
        }

        if report.is_success() {
            info!(
                "Pipeline finished: {} current row(s), {} forecast row(s)",
                report.current_rows, report.forecast_rows
            );
        } else {
            warn!(
                "Pipeline finished with {} failure(s): {} current row(s), {} forecast row(s)",
                report.failures.len(),
                report.current_rows,
                report.forecast_rows
            );
        }

        report
    }

    async fn current_step(&self) -> Result<usize, EtlError> {
        // ---
        let raw = self.extract_current().await?;
        match self.transform_current(Some(&raw))? {
            Some(record) => self.load(std::slice::from_ref(&record), self.tables.current).await,
            None => Ok(0),
        }
    }

    async fn forecast_step(&self) -> Result<usize, EtlError> {
        // ---
        let raw = self.extract_forecast(self.forecast_days).await?;
        match self.transform_forecast(Some(&raw))? {
            Some(records) => self.load(&records, self.tables.forecast).await,
            None => Ok(0),
        }
    }

    /// Read back the latest observation and today's forecast slots.
    pub async fn summarize(&self) -> Result<WeatherSummary, EtlError> {
        // ---
        let latest = self
            .store
            .recent_current(self.tables.current, 1)
            .await?
            .into_iter()
            .next();

        let today = Local::now().date_naive();
        let today_forecast = self
            .store
            .forecast_for_date(self.tables.forecast, today)
            .await?;

        if latest.is_none() && today_forecast.is_empty() {
            info!("No stored weather data to summarize");
        }

        Ok(WeatherSummary {
            latest,
            today_forecast,
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::local_time;
    use serde_json::json;

    fn etl() -> WeatherEtl {
        WeatherEtl::new(Config::with_api_key("KEY")).unwrap()
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        // ---
        let err = WeatherEtl::new(Config::with_api_key("")).unwrap_err();
        assert!(matches!(err, EtlError::ConfigMissing(_)));
    }

    #[test]
    fn test_transforms_pass_through_none() {
        // ---
        let etl = etl();
        assert!(etl.transform_current(None).unwrap().is_none());
        assert!(etl.transform_forecast(None).unwrap().is_none());
    }

    #[test]
    fn test_transform_current_missing_key() {
        // ---
        let etl = etl();
        let raw = json!({"name": "Nowhere"});
        assert!(matches!(
            etl.transform_current(Some(&raw)),
            Err(EtlError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_report_tracks_failures() {
        // ---
        let mut report = PipelineReport::default();
        assert!(report.is_success());

        report.record("current", EtlError::TransportFailure("down".into()));
        assert!(!report.is_success());
        assert!(!report.aborted);

        report.record("forecast", EtlError::ConfigMissing("key".into()));
        assert!(report.aborted);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].step, "current");
    }

    #[test]
    fn test_empty_summary_renders_nothing() {
        // ---
        let summary = WeatherSummary::default();
        assert!(summary.is_empty());
        assert_eq!(summary.to_string(), "");
    }

    #[test]
    fn test_summary_sections() {
        // ---
        let now = Local::now().naive_local();
        let summary = WeatherSummary {
            latest: Some(CurrentWeatherRecord {
                timestamp: now,
                city: "Testville".into(),
                country: "US".into(),
                temperature: 10.0,
                feels_like: 9.0,
                humidity: 50,
                pressure: 1000.0,
                weather_main: "Clear".into(),
                weather_description: "clear sky".into(),
                wind_speed: 0.0,
                wind_direction: 0.0,
                cloudiness: 0,
                visibility: 0.0,
                sunrise: local_time(0).unwrap(),
                sunset: local_time(0).unwrap(),
            }),
            today_forecast: Vec::new(),
        };

        let text = summary.to_string();
        assert!(text.contains("Latest Weather: Testville, US"));
        assert!(text.contains("10.0°C"));
        assert!(!text.contains("Today's Forecast"));
    }
}
