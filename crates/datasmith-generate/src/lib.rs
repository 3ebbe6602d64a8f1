//! Seeded relational data generation for datasmith.
//!
//! This crate turns a normalized schema into rows: a deterministic draw
//! sequence, per-type value generators, edge-case injection and a bounded
//! repair loop, plus CSV, JSON Lines and SQL exporters.

pub mod checks;
pub mod edge_cases;
pub mod engine;
pub mod generators;
pub mod model;
pub mod output;
pub mod repair;
pub mod rng;

pub use engine::GenerationEngine;
pub use model::{GenerationOptions, GenerationOutcome, PoolArena, TableStats};
pub use output::{ExportFormat, OutputError, write_table};
pub use rng::SequenceRng;
