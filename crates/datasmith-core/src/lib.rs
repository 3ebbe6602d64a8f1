//! Core contracts and helpers for datasmith.
//!
//! This crate defines the canonical schema model and its normalizer, the
//! foreign-key planner, the rule language and the row value model shared by
//! the generator, the evaluator and the CLI.

pub mod error;
pub mod graph;
pub mod hashing;
pub mod normalize;
pub mod rules;
pub mod schema;
pub mod text;
pub mod value;

pub use error::{Result, SchemaError};
pub use graph::{DependencyEdge, PlanOutcome, plan_tables};
pub use hashing::config_hash;
pub use normalize::normalize_schema;
pub use rules::{Expression, RuleSet, RuleVerdict, Truth};
pub use schema::{
    Bound, Column, ColumnRange, ColumnType, DatasetConfig, Distribution, ForeignKey, LengthRange,
    Mode, Rule, Schema, Table,
};
pub use text::{decode_schema_text, parse_schema_text};
pub use value::{Row, Value, parse_instant};
