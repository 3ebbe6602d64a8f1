//! Per-table exporters.

pub mod csv;
pub mod jsonl;
pub mod sql;

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use datasmith_core::{Row, Table};

/// Errors emitted while writing table files.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown export format '{0}' (expected csv, jsonl or sql)")]
    UnknownFormat(String),
}

/// File format for exported tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Jsonl,
    Sql,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Sql => "sql",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = OutputError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "jsonl" | "ndjson" => Ok(ExportFormat::Jsonl),
            "sql" => Ok(ExportFormat::Sql),
            other => Err(OutputError::UnknownFormat(other.to_string())),
        }
    }
}

/// Write `rows` of `table` to `path` in `format`; returns bytes written.
pub fn write_table(
    format: ExportFormat,
    path: &Path,
    table: &Table,
    rows: &[Row],
) -> Result<u64, OutputError> {
    match format {
        ExportFormat::Csv => csv::write_table_csv(path, table, rows),
        ExportFormat::Jsonl => jsonl::write_table_jsonl(path, table, rows),
        ExportFormat::Sql => sql::write_table_sql(path, table, rows),
    }
}

pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
