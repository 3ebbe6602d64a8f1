use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use datasmith_core::{Row, Schema, config_hash};
use datasmith_generate::{ExportFormat, GenerationEngine, GenerationOptions, write_table};

use crate::engine::evaluate_dataset;
use crate::errors::EvalError;
use crate::model::QualityReport;
use crate::report::render_report;

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_MARKDOWN: &str = "report.md";

/// A generated dataset with its quality report. Built once per run.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub id: String,
    pub config_hash: String,
    pub order: Vec<String>,
    pub rows_by_table: BTreeMap<String, Vec<Row>>,
    pub report: QualityReport,
}

impl Dataset {
    pub fn rows(&self, table: &str) -> &[Row] {
        self.rows_by_table
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_rows(&self) -> u64 {
        self.rows_by_table.values().map(|rows| rows.len() as u64).sum()
    }

    /// Write one file per table plus `report.json` and `report.md` into `dir`.
    pub fn write_artifacts(
        &self,
        schema: &Schema,
        dir: &Path,
        format: ExportFormat,
    ) -> Result<ArtifactSummary, EvalError> {
        fs::create_dir_all(dir)?;

        let mut tables = Vec::with_capacity(self.order.len());
        for name in &self.order {
            let table = schema
                .table(name)
                .ok_or_else(|| EvalError::UnknownTable(name.clone()))?;
            let path = table_path(dir, name, format);
            let bytes = write_table(format, &path, table, self.rows(name))?;
            info!(
                table = %name,
                path = %path.display(),
                rows = self.rows(name).len(),
                bytes,
                "table exported"
            );
            tables.push(TableArtifact {
                table: name.clone(),
                path,
                rows: self.rows(name).len() as u64,
                bytes,
            });
        }

        let report_json = dir.join(REPORT_JSON);
        fs::write(&report_json, serde_json::to_vec_pretty(&self.report)?)?;
        let report_markdown = dir.join(REPORT_MARKDOWN);
        fs::write(&report_markdown, render_report(self))?;

        Ok(ArtifactSummary {
            tables,
            report_json,
            report_markdown,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableArtifact {
    pub table: String,
    pub path: PathBuf,
    pub rows: u64,
    pub bytes: u64,
}

/// Paths written by [`Dataset::write_artifacts`].
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub tables: Vec<TableArtifact>,
    pub report_json: PathBuf,
    pub report_markdown: PathBuf,
}

/// Where a table's export file lives inside a run directory.
pub(crate) fn table_path(dir: &Path, table: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("{table}.{}", format.extension()))
}

/// Generate, evaluate and assemble a dataset for `schema`.
pub fn build_dataset(schema: &Schema, options: GenerationOptions) -> Dataset {
    let outcome = GenerationEngine::new(options).run(schema);
    let report = evaluate_dataset(schema, &outcome);
    info!(
        dataset_id = %outcome.dataset_id,
        total_violations = report.total_violations,
        failed_rows = report.failed_rows(),
        "dataset evaluated"
    );

    Dataset {
        id: outcome.dataset_id.clone(),
        config_hash: config_hash(schema),
        order: outcome.order().to_vec(),
        rows_by_table: outcome.rows_by_table,
        report,
    }
}
