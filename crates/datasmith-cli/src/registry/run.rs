use std::collections::BTreeMap;
use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use datasmith_core::Schema;
use datasmith_eval::Dataset;
use datasmith_generate::{ExportFormat, GenerationOptions};

use super::{RegistryError, RegistryResult};

/// Inputs needed to place a run on disk.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub dataset_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
}

/// `run.json`: what was generated and with which knobs.
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    pub dataset_id: String,
    pub run_token: String,
    pub name: String,
    pub seed: u64,
    pub mode: String,
    pub config_hash: String,
    pub format: ExportFormat,
    pub max_attempts: u32,
    pub options: GenerationOptions,
    pub tables: Vec<String>,
    pub row_counts: BTreeMap<String, u64>,
    pub total_violations: u64,
    pub started_at: String,
}

impl RunMetadata {
    pub fn new(
        ctx: &RunContext,
        schema: &Schema,
        dataset: &Dataset,
        format: ExportFormat,
        options: GenerationOptions,
    ) -> Self {
        let row_counts = dataset
            .order
            .iter()
            .map(|name| (name.clone(), dataset.rows(name).len() as u64))
            .collect();
        Self {
            dataset_id: dataset.id.clone(),
            run_token: short_id(),
            name: schema.dataset.name.clone(),
            seed: schema.dataset.seed,
            mode: schema.dataset.mode.to_string(),
            config_hash: dataset.config_hash.clone(),
            format,
            max_attempts: schema.dataset.max_attempts,
            options,
            tables: dataset.order.clone(),
            row_counts,
            total_violations: dataset.report.total_violations,
            started_at: ctx.started_at.to_rfc3339(),
        }
    }
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// Create `<run_dir>/<timestamp>__run_<dataset id>/`. A second run of the
/// same dataset within one second gets a short random suffix.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut run_root = ctx
        .run_dir
        .join(format!("{timestamp}__run_{}", ctx.dataset_id));
    if run_root.exists() {
        run_root = ctx
            .run_dir
            .join(format!("{timestamp}__run_{}_{}", ctx.dataset_id, short_id()));
    }

    create_dir_all(&run_root)?;

    let logs_path = run_root.join("logs.ndjson");
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        metadata_path: run_root.join("run.json"),
        logs_path,
        root: run_root,
    })
}

pub fn write_metadata(paths: &RunPaths, metadata: &RunMetadata) -> RegistryResult<()> {
    write_json(&paths.metadata_path, metadata)
}

fn short_id() -> String {
    let id = uuid::Uuid::new_v4().to_string();
    match id.split('-').next() {
        Some(part) if !part.is_empty() => part.to_string(),
        _ => id,
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new().create(true).truncate(true).write(true).open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn run_directory_is_named_after_dataset() {
        let run_dir = std::env::temp_dir().join(format!("datasmith_runs_{}", uuid::Uuid::new_v4()));
        let ctx = RunContext {
            dataset_id: "synth-000042".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            run_dir: run_dir.clone(),
        };

        let first = start_run(&ctx).unwrap();
        assert!(first.root.ends_with("2024-05-01T12-30-00Z__run_synth-000042"));
        assert!(first.logs_path.exists());

        let second = start_run(&ctx).unwrap();
        assert_ne!(first.root, second.root);

        std::fs::remove_dir_all(&run_dir).ok();
    }
}
