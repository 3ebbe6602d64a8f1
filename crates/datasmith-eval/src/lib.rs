//! Quality evaluation for generated datasets.
//!
//! Re-checks every committed row, aggregates coverage and violations per
//! table, renders the markdown report and writes run artifacts. Exported
//! runs can be read back and re-validated, and sample CSVs profiled into
//! schema documents.

pub mod dataset;
pub mod engine;
pub mod errors;
pub mod infer;
pub mod model;
pub mod report;
pub mod validate;

pub use dataset::{
    ArtifactSummary, Dataset, REPORT_JSON, REPORT_MARKDOWN, TableArtifact, build_dataset,
};
pub use engine::{evaluate_dataset, evaluate_rows};
pub use errors::EvalError;
pub use infer::{PiiDetector, infer_schema, infer_schema_from_csv};
pub use model::{Check, QualityReport, TableReport};
pub use report::render_report;
pub use validate::{RunValidation, VALIDATION_JSON, detect_format, validate_run};
