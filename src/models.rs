//! Data models for the weather pipeline.
//!
//! Provider payloads are deserialized into private `Ow*` types that declare
//! which keys are required and which default. Transformation then maps them
//! onto the two record types stored in SQLite.

use chrono::{Local, NaiveDateTime, TimeZone, Timelike};
use serde::Deserialize;
use serde_json::Value;

use crate::EtlError;

// ---

/// Local ISO-8601 layout used for every timestamp column, before the
/// optional `.ffffff` microsecond suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One row of `current_weather`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CurrentWeatherRecord {
    // ---
    pub timestamp: NaiveDateTime,
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i64,
    pub pressure: f64,
    pub weather_main: String,
    pub weather_description: String,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub cloudiness: i64,
    /// Kilometers.
    pub visibility: f64,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
}

/// One row of `weather_forecast`, i.e. one 3-hour slot.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ForecastRecord {
    // ---
    pub forecast_timestamp: NaiveDateTime,
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i64,
    pub pressure: f64,
    pub weather_main: String,
    pub weather_description: String,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub cloudiness: i64,
    /// Kilometers.
    pub visibility: f64,
    /// Percent, 0..=100.
    pub precipitation_probability: f64,
}

// Provider payloads

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: i64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct OwClouds {
    all: i64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    clouds: OwClouds,
    /// Meters.
    #[serde(default)]
    visibility: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    clouds: OwClouds,
    #[serde(default)]
    visibility: Option<f64>,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

// ---

/// Map a current-conditions payload to a record stamped with the local time.
pub fn transform_current(raw: &Value) -> Result<CurrentWeatherRecord, EtlError> {
    transform_current_at(raw, Local::now().naive_local())
}

/// Map a current-conditions payload to a record stamped with `captured_at`.
pub fn transform_current_at(
    raw: &Value,
    captured_at: NaiveDateTime,
) -> Result<CurrentWeatherRecord, EtlError> {
    // ---
    let parsed = OwCurrentResponse::deserialize(raw)
        .map_err(|e| EtlError::ShapeMismatch(format!("current weather payload: {e}")))?;

    let condition = first_condition(parsed.weather, "weather[0]")?;

    Ok(CurrentWeatherRecord {
        timestamp: captured_at,
        city: parsed.name,
        country: parsed.sys.country,
        temperature: parsed.main.temp,
        feels_like: parsed.main.feels_like,
        humidity: parsed.main.humidity,
        pressure: parsed.main.pressure,
        weather_main: condition.main,
        weather_description: condition.description,
        wind_speed: parsed.wind.speed,
        wind_direction: parsed.wind.deg,
        cloudiness: parsed.clouds.all,
        visibility: meters_to_km(parsed.visibility),
        sunrise: local_time(parsed.sys.sunrise)?,
        sunset: local_time(parsed.sys.sunset)?,
    })
}

/// Map every slot of a forecast payload, preserving source order.
pub fn transform_forecast(raw: &Value) -> Result<Vec<ForecastRecord>, EtlError> {
    // ---
    let parsed = OwForecastResponse::deserialize(raw)
        .map_err(|e| EtlError::ShapeMismatch(format!("forecast payload: {e}")))?;

    let OwForecastResponse { city, list } = parsed;

    list.into_iter()
        .enumerate()
        .map(|(i, entry)| -> Result<ForecastRecord, EtlError> {
            let condition = first_condition(entry.weather, &format!("list[{i}].weather[0]"))?;

            Ok(ForecastRecord {
                forecast_timestamp: local_time(entry.dt)?,
                city: city.name.clone(),
                country: city.country.clone(),
                temperature: entry.main.temp,
                feels_like: entry.main.feels_like,
                humidity: entry.main.humidity,
                pressure: entry.main.pressure,
                weather_main: condition.main,
                weather_description: condition.description,
                wind_speed: entry.wind.speed,
                wind_direction: entry.wind.deg,
                cloudiness: entry.clouds.all,
                visibility: meters_to_km(entry.visibility),
                precipitation_probability: entry.pop * 100.0,
            })
        })
        .collect()
}

/// Convert a Unix timestamp to naive local time.
pub fn local_time(ts: i64) -> Result<NaiveDateTime, EtlError> {
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.naive_local())
        .ok_or_else(|| EtlError::ShapeMismatch(format!("timestamp {ts} out of range")))
}

/// Render a timestamp the way it is stored.
///
/// Sub-microsecond precision is dropped; the fraction is omitted when zero.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    let base = ts.format(TIMESTAMP_FORMAT);
    match (ts.nanosecond() % 1_000_000_000) / 1_000 {
        0 => base.to_string(),
        micros => format!("{base}.{micros:06}"),
    }
}

fn first_condition(weather: Vec<OwWeather>, key: &str) -> Result<OwWeather, EtlError> {
    weather
        .into_iter()
        .next()
        .ok_or_else(|| EtlError::ShapeMismatch(format!("missing {key}")))
}

fn meters_to_km(meters: Option<f64>) -> f64 {
    meters.unwrap_or(0.0) / 1000.0
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn captured() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 7)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn full_current_payload() -> Value {
        json!({
            "name": "Oslo",
            "sys": {"country": "NO", "sunrise": 1_754_536_200, "sunset": 1_754_595_900},
            "main": {"temp": 18.4, "feels_like": 17.9, "humidity": 72, "pressure": 1012},
            "weather": [{"main": "Clouds", "description": "broken clouds"}],
            "wind": {"speed": 4.1, "deg": 230},
            "clouds": {"all": 75},
            "visibility": 8500
        })
    }

    fn forecast_entry(dt: i64, temp: f64, pop: f64) -> Value {
        json!({
            "dt": dt,
            "main": {"temp": temp, "feels_like": temp - 1.0, "humidity": 60, "pressure": 1010},
            "weather": [{"main": "Rain", "description": "light rain"}],
            "wind": {"speed": 2.5, "deg": 90},
            "clouds": {"all": 40},
            "visibility": 10000,
            "pop": pop
        })
    }

    #[test]
    fn test_current_field_mapping() {
        // ---
        let record = transform_current_at(&full_current_payload(), captured()).unwrap();

        assert_eq!(record.timestamp, captured());
        assert_eq!(record.city, "Oslo");
        assert_eq!(record.country, "NO");
        assert_eq!(record.temperature, 18.4);
        assert_eq!(record.feels_like, 17.9);
        assert_eq!(record.humidity, 72);
        assert_eq!(record.pressure, 1012.0);
        assert_eq!(record.weather_main, "Clouds");
        assert_eq!(record.weather_description, "broken clouds");
        assert_eq!(record.wind_speed, 4.1);
        assert_eq!(record.wind_direction, 230.0);
        assert_eq!(record.cloudiness, 75);
        assert_eq!(record.visibility, 8.5);
        assert_eq!(record.sunrise, local_time(1_754_536_200).unwrap());
        assert_eq!(record.sunset, local_time(1_754_595_900).unwrap());
    }

    #[test]
    fn test_current_defaults_for_optional_fields() {
        // ---
        let raw = json!({
            "name": "Testville",
            "sys": {"country": "US", "sunrise": 0, "sunset": 0},
            "main": {"temp": 10, "feels_like": 9, "humidity": 50, "pressure": 1000},
            "weather": [{"main": "Clear", "description": "clear sky"}],
            "wind": {},
            "clouds": {"all": 0}
        });

        let record = transform_current_at(&raw, captured()).unwrap();

        assert_eq!(record.temperature, 10.0);
        assert_eq!(record.wind_speed, 0.0);
        assert_eq!(record.wind_direction, 0.0);
        assert_eq!(record.visibility, 0.0);
    }

    #[test]
    fn test_current_without_wind_object() {
        // ---
        let mut raw = full_current_payload();
        raw.as_object_mut().unwrap().remove("wind");

        let record = transform_current_at(&raw, captured()).unwrap();
        assert_eq!(record.wind_speed, 0.0);
        assert_eq!(record.wind_direction, 0.0);
    }

    #[test]
    fn test_current_missing_required_key() {
        // ---
        for key in ["main", "sys", "name", "clouds", "weather"] {
            let mut raw = full_current_payload();
            raw.as_object_mut().unwrap().remove(key);

            let err = transform_current_at(&raw, captured()).unwrap_err();
            assert!(
                matches!(err, EtlError::ShapeMismatch(_)),
                "removing `{key}` should be a shape mismatch, got {err:?}"
            );
        }
    }

    #[test]
    fn test_current_empty_weather_array() {
        // ---
        let mut raw = full_current_payload();
        raw["weather"] = json!([]);

        let err = transform_current_at(&raw, captured()).unwrap_err();
        assert!(err.to_string().contains("weather[0]"));
    }

    #[test]
    fn test_forecast_preserves_count_and_order() {
        // ---
        let raw = json!({
            "city": {"name": "Oslo", "country": "NO"},
            "list": [
                forecast_entry(1_754_546_400, 15.0, 0.0),
                forecast_entry(1_754_557_200, 17.5, 0.25),
                forecast_entry(1_754_568_000, 19.0, 1.0),
            ]
        });

        let records = transform_forecast(&raw).unwrap();

        assert_eq!(records.len(), 3);
        let temps: Vec<f64> = records.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![15.0, 17.5, 19.0]);

        let pops: Vec<f64> = records.iter().map(|r| r.precipitation_probability).collect();
        assert_eq!(pops, vec![0.0, 25.0, 100.0]);

        assert_eq!(records[0].forecast_timestamp, local_time(1_754_546_400).unwrap());
        assert!(records.iter().all(|r| r.city == "Oslo" && r.country == "NO"));
        assert!(records.iter().all(|r| r.visibility == 10.0));
    }

    #[test]
    fn test_forecast_defaults_pop_and_wind() {
        // ---
        let mut entry = forecast_entry(1_754_546_400, 15.0, 0.5);
        let obj = entry.as_object_mut().unwrap();
        obj.remove("pop");
        obj.remove("wind");
        obj.remove("visibility");

        let raw = json!({"city": {"name": "Oslo", "country": "NO"}, "list": [entry]});
        let records = transform_forecast(&raw).unwrap();

        assert_eq!(records[0].precipitation_probability, 0.0);
        assert_eq!(records[0].wind_speed, 0.0);
        assert_eq!(records[0].visibility, 0.0);
    }

    #[test]
    fn test_forecast_empty_list() {
        // ---
        let raw = json!({"city": {"name": "Oslo", "country": "NO"}, "list": []});
        assert!(transform_forecast(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_forecast_missing_list_or_city() {
        // ---
        let no_list = json!({"city": {"name": "Oslo", "country": "NO"}});
        assert!(matches!(
            transform_forecast(&no_list),
            Err(EtlError::ShapeMismatch(_))
        ));

        let no_city = json!({"list": [forecast_entry(0, 1.0, 0.0)]});
        assert!(matches!(
            transform_forecast(&no_city),
            Err(EtlError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_forecast_bad_entry_fails_whole_payload() {
        // ---
        let mut bad = forecast_entry(0, 1.0, 0.0);
        bad.as_object_mut().unwrap().remove("main");

        let raw = json!({
            "city": {"name": "Oslo", "country": "NO"},
            "list": [forecast_entry(0, 1.0, 0.0), bad]
        });
        assert!(transform_forecast(&raw).is_err());
    }

    #[test]
    fn test_timestamp_format() {
        // ---
        assert_eq!(format_timestamp(&captured()), "2025-08-07T12:00:00");

        let with_micros = captured() + chrono::Duration::microseconds(123_456);
        assert_eq!(format_timestamp(&with_micros), "2025-08-07T12:00:00.123456");
    }

    #[test]
    fn test_timestamp_truncates_to_microseconds() {
        // ---
        let with_nanos = captured() + chrono::Duration::nanoseconds(503_754_438);
        assert_eq!(format_timestamp(&with_nanos), "2025-08-07T12:00:00.503754");

        let sub_micro = captured() + chrono::Duration::nanoseconds(999);
        assert_eq!(format_timestamp(&sub_micro), "2025-08-07T12:00:00");

        let leading_zeros = captured() + chrono::Duration::microseconds(42);
        assert_eq!(format_timestamp(&leading_zeros), "2025-08-07T12:00:00.000042");
    }
}
