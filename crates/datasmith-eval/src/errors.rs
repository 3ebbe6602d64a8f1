use std::path::PathBuf;

use thiserror::Error;

use datasmith_generate::OutputError;

/// Errors emitted while writing, reading back or profiling datasets.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("export error: {0}")]
    Output(#[from] OutputError),
    #[error("table '{0}' not found in schema")]
    UnknownTable(String),
    #[error("{path}:{line}: invalid json row: {source}")]
    JsonRow {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("no rows found in sample '{0}'")]
    EmptySample(String),
    #[error("no table files found in {0}")]
    NoTableFiles(PathBuf),
}
