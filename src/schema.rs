//! Database schema management for `weather-etl`.
//!
//! Ensures the weather tables exist before every load. All statements are
//! `CREATE ... IF NOT EXISTS`, so nothing here is ever destructive.

use sqlx::{Connection, SqliteConnection};

use crate::EtlError;

// ---

/// The pair of tables a job writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSet {
    pub current: &'static str,
    pub forecast: &'static str,
}

impl TableSet {
    /// Tables written by the live pipeline.
    pub const LIVE: TableSet = TableSet {
        current: "current_weather",
        forecast: "weather_forecast",
    };

    /// Tables written by the demo job.
    pub const DEMO: TableSet = TableSet {
        current: "current_weather_demo",
        forecast: "weather_forecast_demo",
    };
}

/// Accept only plain identifiers (`[A-Za-z_][A-Za-z0-9_]*`) as table names.
pub fn validate_table_name(name: &str) -> Result<&str, EtlError> {
    // ---
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(name)
    } else {
        Err(EtlError::StorageFailure(format!("invalid table name '{name}'")))
    }
}

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create both weather tables of `tables` (idempotent).
///
/// Runs in one transaction; errors are propagated as `StorageFailure`.
pub async fn create_tables(conn: &mut SqliteConnection, tables: TableSet) -> Result<(), EtlError> {
    // ---
    let current = validate_table_name(tables.current)?;
    let forecast = validate_table_name(tables.forecast)?;

    let mut tx = conn.begin().await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {current} (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp           TEXT,
            city                TEXT,
            country             TEXT,
            temperature         REAL,
            feels_like          REAL,
            humidity            INTEGER,
            pressure            REAL,
            weather_main        TEXT,
            weather_description TEXT,
            wind_speed          REAL,
            wind_direction      REAL,
            cloudiness          INTEGER,
            visibility          REAL,
            sunrise             TEXT,
            sunset              TEXT
        );
        "#
    ))
    .execute(&mut *tx)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {forecast} (
            id                        INTEGER PRIMARY KEY AUTOINCREMENT,
            forecast_timestamp        TEXT,
            city                      TEXT,
            country                   TEXT,
            temperature               REAL,
            feels_like                REAL,
            humidity                  INTEGER,
            pressure                  REAL,
            weather_main              TEXT,
            weather_description       TEXT,
            wind_speed                REAL,
            wind_direction            REAL,
            cloudiness                INTEGER,
            visibility                REAL,
            precipitation_probability REAL
        );
        "#
    ))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Create a table of TEXT columns named after `columns` (idempotent).
pub async fn create_text_table(
    conn: &mut SqliteConnection,
    table: &str,
    columns: &[String],
) -> Result<(), EtlError> {
    // ---
    let table = validate_table_name(table)?;
    if columns.is_empty() {
        return Err(EtlError::ShapeMismatch(format!(
            "table '{table}' needs at least one column"
        )));
    }

    let column_defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} TEXT", quote_ident(c)))
        .collect();

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (_row_id INTEGER PRIMARY KEY AUTOINCREMENT, {})",
        column_defs.join(", ")
    ))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Whether `table` exists in the connected database.
pub async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool, EtlError> {
    // ---
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(table)
            .fetch_one(&mut *conn)
            .await?;

    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    async fn memory_conn() -> SqliteConnection {
        SqliteConnection::connect("sqlite::memory:").await.unwrap()
    }

    async fn user_tables(conn: &mut SqliteConnection) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut *conn)
        .await
        .unwrap()
    }

    async fn schema_sql(conn: &mut SqliteConnection) -> Vec<String> {
        sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&mut *conn)
            .await
            .unwrap()
    }

    #[test]
    fn test_table_name_validation() {
        // ---
        assert!(validate_table_name("current_weather").is_ok());
        assert!(validate_table_name("_t1").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1abc").is_err());
        assert!(validate_table_name("weather; DROP TABLE x").is_err());
        assert!(validate_table_name("a-b").is_err());
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        // ---
        assert_eq!(quote_ident("0"), "\"0\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() {
        // ---
        let mut conn = memory_conn().await;

        create_tables(&mut conn, TableSet::LIVE).await.unwrap();
        let tables_first = user_tables(&mut conn).await;
        let schema_first = schema_sql(&mut conn).await;

        create_tables(&mut conn, TableSet::LIVE).await.unwrap();
        let tables_second = user_tables(&mut conn).await;
        let schema_second = schema_sql(&mut conn).await;

        assert_eq!(tables_first, vec!["current_weather", "weather_forecast"]);
        assert_eq!(tables_first, tables_second);
        assert_eq!(schema_first, schema_second);
    }

    #[tokio::test]
    async fn test_demo_tables_are_separate() {
        // ---
        let mut conn = memory_conn().await;
        create_tables(&mut conn, TableSet::DEMO).await.unwrap();

        assert!(table_exists(&mut conn, "current_weather_demo").await.unwrap());
        assert!(table_exists(&mut conn, "weather_forecast_demo").await.unwrap());
        assert!(!table_exists(&mut conn, "current_weather").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_text_table_quotes_columns() {
        // ---
        let mut conn = memory_conn().await;
        let columns = vec!["0".to_string(), "name".to_string()];

        create_text_table(&mut conn, "source_data", &columns).await.unwrap();
        create_text_table(&mut conn, "source_data", &columns).await.unwrap();

        assert!(table_exists(&mut conn, "source_data").await.unwrap());
        assert!(create_text_table(&mut conn, "bad name", &columns).await.is_err());
        assert!(create_text_table(&mut conn, "empty", &[]).await.is_err());
    }
}
