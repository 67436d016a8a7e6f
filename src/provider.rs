//! OpenWeatherMap HTTP client (the extract step).

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::{config::mask_secret, Config, EtlError};

// ---

/// Endpoints exposed by the provider under its base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Current,
    Forecast,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Current => "weather",
            Endpoint::Forecast => "forecast",
        }
    }
}

/// Thin client over the `/weather` and `/forecast` endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    http: Client,
    base_url: String,
    api_key: String,
    city: String,
    country: String,
}

impl OpenWeatherClient {
    pub fn new(config: &Config) -> Result<Self, EtlError> {
        let http = Client::builder()
            .build()
            .map_err(|e| EtlError::TransportFailure(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            city: config.city.clone(),
            country: config.country.clone(),
        })
    }

    /// GET `{base_url}/{endpoint}?q={city},{country}&appid={key}&units=metric`.
    ///
    /// Missing credentials or location fail with `ConfigMissing` before any
    /// request is made; everything else is a `TransportFailure`.
    pub async fn fetch(&self, endpoint: Endpoint) -> Result<Value, EtlError> {
        // ---
        self.check_config()?;

        let url = format!("{}/{}", self.base_url, endpoint.path());
        let location = format!("{},{}", self.city, self.country);

        debug!(
            "GET {}?q={}&appid={}&units=metric",
            url,
            location,
            mask_secret(&self.api_key)
        );

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", location.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("Request to {} failed: {}", url, e);
                EtlError::TransportFailure(format!("request to {url} failed: {e}"))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            EtlError::TransportFailure(format!("failed to read body from {url}: {e}"))
        })?;

        if !status.is_success() {
            error!("{} returned status {}", url, status);
            return Err(EtlError::TransportFailure(format!(
                "{} returned status {}: {}",
                url,
                status,
                truncate_body(&body)
            )));
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| {
            EtlError::TransportFailure(format!("{url} returned invalid JSON: {e}"))
        })?;

        info!("Fetched {} data for {}", endpoint.path(), location);
        Ok(payload)
    }

    fn check_config(&self) -> Result<(), EtlError> {
        if self.api_key.trim().is_empty() {
            return Err(EtlError::ConfigMissing("OPENWEATHER_API_KEY is empty".into()));
        }
        if self.city.trim().is_empty() || self.country.trim().is_empty() {
            return Err(EtlError::ConfigMissing(
                "WEATHER_CITY and WEATHER_COUNTRY must both be set".into(),
            ));
        }
        Ok(())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
