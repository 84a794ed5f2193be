//! wi_export - Delimited-text output for WLAN Inventory tables

use chrono::{DateTime, TimeZone};
use csv::WriterBuilder;
use std::fmt::{Display, Write as _};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};
use wi_collect::Table;

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
pub const DEFAULT_DELIMITER: u8 = b',';

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid timestamp format: {0}")]
    TimestampFormat(String),
}

/// Write a table as delimited text
///
/// Rows are written as-is, so a permissive table may have ragged lines.
/// A table with no header and no rows writes nothing.
pub fn write_table_to<W: Write>(table: &Table, writer: W, delimiter: u8) -> Result<(), ExportError> {
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(writer);

    if !table.header.is_empty() {
        wtr.write_record(&table.header)?;
    }
    for row in &table.rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write a table to a file, creating its parent directory if needed
#[instrument(skip(table), fields(rows = table.len()))]
pub fn write_table(table: &Table, path: &Path, delimiter: u8) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    write_table_to(table, file, delimiter)?;

    info!(path = %path.display(), "Table exported");
    Ok(())
}

/// Render a timestamp, rejecting unknown format specifiers
pub fn format_timestamp<Tz>(at: &DateTime<Tz>, format: &str) -> Result<String, ExportError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    write!(out, "{}", at.format(format))
        .map_err(|_| ExportError::TimestampFormat(format.to_string()))?;
    Ok(out)
}

/// `<dir>/<device>-<artifact>-<timestamp><ext>`
pub fn output_filename(
    dir: &Path,
    device: &str,
    artifact: &str,
    timestamp: &str,
    ext: &str,
) -> PathBuf {
    let name = format!("{}-{artifact}-{timestamp}{ext}", sanitize(device));
    debug!(file = %name, "Output file name");
    dir.join(name)
}

fn sanitize(device: &str) -> String {
    let cleaned: String = device
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "device".to_string()
    } else {
        cleaned
    }
}
