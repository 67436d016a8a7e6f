//! Legacy CSV → SQL job.
//!
//! Reads a headed CSV file, drops incomplete rows, keeps rows whose `"0"`
//! column exceeds 18 and appends the survivors to a text table.

use std::{io::Read, path::Path};

use tracing::{info, warn};

use crate::{store::Store, EtlError};

pub const DEFAULT_INPUT: &str = "data/source_data.csv";
pub const DEFAULT_TABLE: &str = "source_data";

const FILTER_COLUMN: &str = "0";
const FILTER_THRESHOLD: f64 = 18.0;

/// Headers plus rows, all as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Rows seen at each stage of one legacy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyReport {
    pub extracted: usize,
    pub kept: usize,
    pub loaded: usize,
}

pub fn extract_csv(path: &Path) -> Result<CsvTable, EtlError> {
    // ---
    let file = std::fs::File::open(path).map_err(|e| {
        EtlError::TransportFailure(format!("Failed to open CSV source '{}': {e}", path.display()))
    })?;
    let table = extract_from_reader(file)?;

    info!(
        "Extracted {} row(s) with {} column(s) from {}",
        table.rows.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

pub fn extract_from_reader<R: Read>(reader: R) -> Result<CsvTable, EtlError> {
    // ---
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect::<Vec<String>>()))
        .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

    Ok(CsvTable { headers, rows })
}

/// Drop rows with any empty field, then keep rows whose `"0"` value is a
/// number greater than 18.
pub fn transform_rows(table: CsvTable) -> Result<CsvTable, EtlError> {
    // ---
    let column = table
        .headers
        .iter()
        .position(|h| h == FILTER_COLUMN)
        .ok_or_else(|| EtlError::ShapeMismatch(format!("missing column '{FILTER_COLUMN}'")))?;

    let before = table.rows.len();
    let rows: Vec<Vec<String>> = table
        .rows
        .into_iter()
        .filter(|row| row.iter().all(|v| !v.is_empty()))
        .filter(|row| {
            row.get(column)
                .and_then(|v| v.parse::<f64>().ok())
                .is_some_and(|v| v > FILTER_THRESHOLD)
        })
        .collect();

    if rows.len() < before {
        info!("Filtered out {} of {} row(s)", before - rows.len(), before);
    }

    Ok(CsvTable {
        headers: table.headers,
        rows,
    })
}

/// Extract, filter and append `input` into `table` of `store`.
pub async fn run_legacy(input: &Path, store: &Store, table: &str) -> Result<LegacyReport, EtlError> {
    // ---
    let extracted = extract_csv(input)?;
    let extracted_count = extracted.rows.len();

    let kept = transform_rows(extracted)?;
    if kept.rows.is_empty() {
        warn!("No CSV rows passed the filter; {} will only be created", table);
    }

    let loaded = store.load_text_rows(table, &kept.headers, &kept.rows).await?;

    Ok(LegacyReport {
        extracted: extracted_count,
        kept: kept.rows.len(),
        loaded,
    })
}
