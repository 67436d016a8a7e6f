//! SQLite store access.
//!
//! Every public operation opens its own connection and closes it before
//! returning; no pool or transaction spans more than one call.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteConnectOptions},
    Connection, Sqlite, SqliteConnection,
};
use tracing::{debug, info, warn};

use crate::{
    models::format_timestamp,
    schema::{self, quote_ident, validate_table_name, TableSet},
    CurrentWeatherRecord, EtlError, ForecastRecord,
};

// ---

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A row type that can be appended to a weather table.
pub trait Record {
    /// Column names in bind order.
    const COLUMNS: &'static [&'static str];

    /// Bind this record's values in `COLUMNS` order.
    fn bind_values<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

impl Record for CurrentWeatherRecord {
    const COLUMNS: &'static [&'static str] = &[
        "timestamp",
        "city",
        "country",
        "temperature",
        "feels_like",
        "humidity",
        "pressure",
        "weather_main",
        "weather_description",
        "wind_speed",
        "wind_direction",
        "cloudiness",
        "visibility",
        "sunrise",
        "sunset",
    ];

    fn bind_values<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(format_timestamp(&self.timestamp))
            .bind(self.city.as_str())
            .bind(self.country.as_str())
            .bind(self.temperature)
            .bind(self.feels_like)
            .bind(self.humidity)
            .bind(self.pressure)
            .bind(self.weather_main.as_str())
            .bind(self.weather_description.as_str())
            .bind(self.wind_speed)
            .bind(self.wind_direction)
            .bind(self.cloudiness)
            .bind(self.visibility)
            .bind(format_timestamp(&self.sunrise))
            .bind(format_timestamp(&self.sunset))
    }
}

impl Record for ForecastRecord {
    const COLUMNS: &'static [&'static str] = &[
        "forecast_timestamp",
        "city",
        "country",
        "temperature",
        "feels_like",
        "humidity",
        "pressure",
        "weather_main",
        "weather_description",
        "wind_speed",
        "wind_direction",
        "cloudiness",
        "visibility",
        "precipitation_probability",
    ];

    fn bind_values<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(format_timestamp(&self.forecast_timestamp))
            .bind(self.city.as_str())
            .bind(self.country.as_str())
            .bind(self.temperature)
            .bind(self.feels_like)
            .bind(self.humidity)
            .bind(self.pressure)
            .bind(self.weather_main.as_str())
            .bind(self.weather_description.as_str())
            .bind(self.wind_speed)
            .bind(self.wind_direction)
            .bind(self.cloudiness)
            .bind(self.visibility)
            .bind(self.precipitation_probability)
    }
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Handle on the store file. Cheap to clone; holds no connection.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Open a fresh connection, creating the parent directory and file if needed.
    async fn connect(&self) -> Result<SqliteConnection, EtlError> {
        // ---
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                EtlError::StorageFailure(format!(
                    "Failed to create store directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);

        let conn = SqliteConnection::connect_with(&options).await.map_err(|e| {
            EtlError::StorageFailure(format!(
                "Failed to open store '{}': {e}",
                self.path.display()
            ))
        })?;

        debug!("Opened store connection: {}", self.path.display());
        Ok(conn)
    }

    /// Close `conn`, logging a close error instead of returning it.
    async fn close(&self, conn: SqliteConnection) {
        if let Err(e) = conn.close().await {
            warn!("Failed to close store '{}': {}", self.path.display(), e);
        }
    }

    /// Ensure both tables of `tables` exist.
    pub async fn create_tables(&self, tables: TableSet) -> Result<(), EtlError> {
        // ---
        let mut conn = self.connect().await?;
        let result = schema::create_tables(&mut conn, tables).await;
        self.close(conn).await;
        result?;

        debug!(
            "Tables ensured: {}, {} in {}",
            tables.current,
            tables.forecast,
            self.path.display()
        );
        Ok(())
    }

    /// Append `records` to `table` in one transaction.
    ///
    /// An empty slice is a no-op: the store is not opened and the table name
    /// is not checked. Returns the number of rows inserted.
    pub async fn load<R: Record>(&self, records: &[R], table: &str) -> Result<usize, EtlError> {
        // ---
        if records.is_empty() {
            info!("No records to load into {}", table);
            return Ok(0);
        }

        let table = validate_table_name(table)?;

        let sql = insert_sql(table, R::COLUMNS);
        let mut conn = self.connect().await?;

        let result = async {
            let mut tx = conn.begin().await?;
            for record in records {
                record.bind_values(sqlx::query(&sql)).execute(&mut *tx).await?;
            }
            tx.commit().await?;
            Ok::<_, EtlError>(())
        }
        .await;

        self.close(conn).await;
        result?;

        info!("Loaded {} record(s) into {}", records.len(), table);
        Ok(records.len())
    }

    /// Append untyped text rows, creating the table from `headers` if needed.
    pub async fn load_text_rows(
        &self,
        table: &str,
        headers: &[String],
        rows: &[Vec<String>],
    ) -> Result<usize, EtlError> {
        // ---
        let table = validate_table_name(table)?;
        let mut conn = self.connect().await?;

        let result = async {
            schema::create_text_table(&mut conn, table, headers).await?;

            if rows.is_empty() {
                return Ok::<_, EtlError>(0);
            }

            let columns: Vec<String> = headers.iter().map(|h| quote_ident(h)).collect();
            let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
            let sql = insert_sql(table, &column_refs);

            let mut tx = conn.begin().await?;
            for row in rows {
                if row.len() != headers.len() {
                    return Err(EtlError::ShapeMismatch(format!(
                        "row has {} fields, expected {}",
                        row.len(),
                        headers.len()
                    )));
                }
                let mut query = sqlx::query(&sql);
                for value in row {
                    query = query.bind(value.as_str());
                }
                query.execute(&mut *tx).await?;
            }
            tx.commit().await?;
            Ok(rows.len())
        }
        .await;

        self.close(conn).await;
        let inserted = result?;

        info!("Loaded {} row(s) into {}", inserted, table);
        Ok(inserted)
    }

    /// Most recent current-weather rows, newest first.
    ///
    /// A missing store or table reads as empty.
    pub async fn recent_current(
        &self,
        table: &str,
        limit: u32,
    ) -> Result<Vec<CurrentWeatherRecord>, EtlError> {
        // ---
        let table = validate_table_name(table)?;
        if !self.exists() {
            return Ok(Vec::new());
        }

        let mut conn = self.connect().await?;
        let result = async {
            if !schema::table_exists(&mut conn, table).await? {
                return Ok(Vec::new());
            }
            let rows = sqlx::query_as::<_, CurrentWeatherRecord>(&format!(
                "SELECT * FROM {table} ORDER BY timestamp DESC LIMIT ?1"
            ))
            .bind(limit)
            .fetch_all(&mut conn)
            .await?;
            Ok::<_, EtlError>(rows)
        }
        .await;

        self.close(conn).await;
        result
    }

    /// Forecast rows whose date component equals `date`, in slot order.
    pub async fn forecast_for_date(
        &self,
        table: &str,
        date: NaiveDate,
    ) -> Result<Vec<ForecastRecord>, EtlError> {
        // ---
        let table = validate_table_name(table)?;
        if !self.exists() {
            return Ok(Vec::new());
        }

        let mut conn = self.connect().await?;
        let result = async {
            if !schema::table_exists(&mut conn, table).await? {
                return Ok(Vec::new());
            }
            let rows = sqlx::query_as::<_, ForecastRecord>(&format!(
                "SELECT * FROM {table} WHERE date(forecast_timestamp) = ?1 \
                 ORDER BY forecast_timestamp"
            ))
            .bind(date.format("%Y-%m-%d").to_string())
            .fetch_all(&mut conn)
            .await?;
            Ok::<_, EtlError>(rows)
        }
        .await;

        self.close(conn).await;
        result
    }

    /// The first `limit` forecast rows ordered by slot time.
    pub async fn earliest_forecast(
        &self,
        table: &str,
        limit: u32,
    ) -> Result<Vec<ForecastRecord>, EtlError> {
        // ---
        let table = validate_table_name(table)?;
        if !self.exists() {
            return Ok(Vec::new());
        }

        let mut conn = self.connect().await?;
        let result = async {
            if !schema::table_exists(&mut conn, table).await? {
                return Ok(Vec::new());
            }
            let rows = sqlx::query_as::<_, ForecastRecord>(&format!(
                "SELECT * FROM {table} ORDER BY forecast_timestamp LIMIT ?1"
            ))
            .bind(limit)
            .fetch_all(&mut conn)
            .await?;
            Ok::<_, EtlError>(rows)
        }
        .await;

        self.close(conn).await;
        result
    }

    /// Row count of `table`; a missing store or table counts as zero.
    pub async fn count(&self, table: &str) -> Result<i64, EtlError> {
        // ---
        let table = validate_table_name(table)?;
        if !self.exists() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let result = async {
            if !schema::table_exists(&mut conn, table).await? {
                return Ok(0);
            }
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&mut conn)
                .await?;
            Ok::<_, EtlError>(count)
        }
        .await;

        self.close(conn).await;
        result
    }
}
