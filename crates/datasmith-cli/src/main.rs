mod registry;
mod settings;

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::info;

use datasmith_core::{Mode, PlanOutcome, Schema, SchemaError, config_hash, parse_schema_text, plan_tables};
use datasmith_eval::{EvalError, build_dataset, infer_schema_from_csv, validate_run};
use datasmith_generate::{ExportFormat, GenerationOptions};
use registry::{
    RunContext, RunMetadata, init_console_logging, init_run_logging, start_run, write_metadata,
};
use settings::{SettingsError, load_settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read schema {path}: {source}")]
    ReadSchema {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("export error: {0}")]
    Eval(#[from] EvalError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("failed to write {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Parser, Debug)]
#[command(name = "datasmith", version, about = "Seeded synthetic relational datasets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dataset and write its run directory.
    Generate(GenerateArgs),
    /// Print the table generation order.
    Plan(SchemaArgs),
    /// Print the normalized schema and its config hash.
    Normalize(SchemaArgs),
    /// Infer a schema from a sample CSV file.
    Infer(InferArgs),
    /// Re-validate an exported run directory against its schema.
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Schema file (YAML or JSON).
    #[arg(value_name = "SCHEMA")]
    schema: PathBuf,
}

#[derive(Args, Debug)]
struct InferArgs {
    /// Sample CSV with a header row; the file stem names the table.
    #[arg(value_name = "CSV")]
    csv: PathBuf,
    /// Write the schema here instead of printing it.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Emit JSON instead of YAML.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Run directory holding the exported table files.
    #[arg(value_name = "RUN_DIR")]
    run_dir: PathBuf,
    /// Schema the run was generated from.
    #[arg(long)]
    schema: PathBuf,
    /// Table file format; detected from the directory when omitted.
    #[arg(long)]
    format: Option<ExportFormat>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Schema file (YAML or JSON).
    #[arg(value_name = "SCHEMA")]
    schema: PathBuf,
    /// Override the schema's seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Override the schema's mode (valid, invalid, boundary).
    #[arg(long)]
    mode: Option<String>,
    /// Override the schema's repair budget per row.
    #[arg(long)]
    max_attempts: Option<u32>,
    /// Override the dataset name.
    #[arg(long)]
    name: Option<String>,
    /// Inject boundary values.
    #[arg(long, default_value_t = false)]
    boundary: bool,
    /// Inject nulls into nullable columns.
    #[arg(long, default_value_t = false)]
    nulls: bool,
    /// Inject invalid values; also forces invalid mode.
    #[arg(long, default_value_t = false)]
    invalid: bool,
    /// Export format for table files (csv, jsonl, sql).
    #[arg(long)]
    format: Option<ExportFormat>,
    /// Parent directory for run directories.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Settings file; defaults to ./datasmith.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Plan(args) => run_plan(args),
        Command::Normalize(args) => run_normalize(args),
        Command::Infer(args) => run_infer(args),
        Command::Validate(args) => run_validate(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let log = init_run_logging()?;
    let settings = load_settings(args.config.as_deref())?;
    let mut schema = read_schema(&args.schema)?;

    if let Some(seed) = args.seed {
        schema.dataset.seed = seed;
    }
    if let Some(mode) = args.mode.as_deref() {
        schema.dataset.mode = Mode::parse(mode);
    }
    if let Some(max_attempts) = args.max_attempts {
        schema.dataset.max_attempts = max_attempts;
    }
    if let Some(name) = args.name {
        schema.dataset.name = name;
    }

    let options = GenerationOptions {
        boundary: args.boundary || settings.boundary,
        nulls: args.nulls || settings.nulls,
        invalid: args.invalid || settings.invalid,
    };
    if options.invalid {
        schema.dataset.mode = Mode::Invalid;
    }
    let format = args.format.unwrap_or(settings.format);
    let run_dir = args.out.unwrap_or(settings.out_dir);

    let started_at = Utc::now();
    let dataset = build_dataset(&schema, options);

    let ctx = RunContext {
        dataset_id: dataset.id.clone(),
        started_at,
        run_dir,
    };
    let paths = start_run(&ctx)?;
    log.attach(&paths.logs_path)?;

    let artifacts = dataset.write_artifacts(&schema, &paths.root, format)?;
    let metadata = RunMetadata::new(&ctx, &schema, &dataset, format, options);
    write_metadata(&paths, &metadata)?;

    info!(
        dataset_id = %dataset.id,
        run_dir = %paths.root.display(),
        tables = artifacts.tables.len(),
        "run completed"
    );
    println!(
        "{}: {} rows in {} tables, {} violations -> {}",
        dataset.id,
        dataset.total_rows(),
        dataset.order.len(),
        dataset.report.total_violations,
        paths.root.display()
    );
    Ok(())
}

fn run_plan(args: SchemaArgs) -> Result<(), CliError> {
    init_console_logging()?;
    let schema = read_schema(&args.schema)?;
    let plan = plan_tables(&schema);

    for (index, table) in plan.order().iter().enumerate() {
        println!("{}. {} ({} rows)", index + 1, table, schema.rows_for(table));
    }
    if let PlanOutcome::Cyclic { offending_edges, .. } = &plan {
        let edges: Vec<String> = offending_edges
            .iter()
            .map(|edge| format!("{} -> {}", edge.from, edge.to))
            .collect();
        println!("cycle detected, declaration order used: {}", edges.join(", "));
    }
    Ok(())
}

fn run_normalize(args: SchemaArgs) -> Result<(), CliError> {
    init_console_logging()?;
    let schema = read_schema(&args.schema)?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    println!("config_hash: {}", config_hash(&schema));
    Ok(())
}

fn run_infer(args: InferArgs) -> Result<(), CliError> {
    init_console_logging()?;
    let document = infer_schema_from_csv(&args.csv)?;
    let text = if args.json {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_yaml_ng::to_string(&document)?
    };

    match args.out {
        Some(path) => {
            std::fs::write(&path, text).map_err(|source| CliError::WriteOutput {
                path: path.clone(),
                source,
            })?;
            info!(sample = %args.csv.display(), path = %path.display(), "schema written");
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    init_console_logging()?;
    let schema = read_schema(&args.schema)?;
    let validation = validate_run(&schema, &args.run_dir, args.format)?;
    let report_path = validation.write_report()?;

    for table in &validation.order {
        if let Some(report) = validation.report.table(table) {
            println!(
                "{}: {} rows, {} failed, {} violations",
                table,
                report.row_count,
                report.failed_rows,
                report.total_violations()
            );
        }
    }
    for table in &validation.missing_tables {
        println!("{table}: file missing");
    }
    println!(
        "{} violations ({}) -> {}",
        validation.report.total_violations,
        validation.format,
        report_path.display()
    );
    Ok(())
}

fn read_schema(path: &Path) -> Result<Schema, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadSchema {
        path: path.to_path_buf(),
        source,
    })?;
    let schema = parse_schema_text(&text)?;
    info!(
        path = %path.display(),
        dataset = %schema.dataset.name,
        tables = schema.tables.len(),
        "schema loaded"
    );
    Ok(schema)
}
