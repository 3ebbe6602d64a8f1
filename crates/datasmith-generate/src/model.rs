use std::collections::{BTreeMap, HashSet};

use rand_regex::Regex as RandRegex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use datasmith_core::{Column, ColumnType, ForeignKey, Mode, PlanOutcome, Row, Table, Value};

/// Longest repetition a regex sampler expands `*` and `+` to.
const SAMPLER_MAX_REPEAT: u32 = 10;

/// Edge-case injection toggles for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Occasionally replace values with range/length/enum extremes.
    pub boundary: bool,
    /// Occasionally null out nullable columns.
    pub nulls: bool,
    /// Occasionally replace values with structurally invalid placeholders.
    pub invalid: bool,
}

impl GenerationOptions {
    /// Fold the dataset mode into the toggles: `invalid` and `boundary`
    /// modes switch on the matching injector.
    pub fn effective(self, mode: &Mode) -> Self {
        Self {
            boundary: self.boundary || *mode == Mode::Boundary,
            nulls: self.nulls,
            invalid: self.invalid || *mode == Mode::Invalid,
        }
    }
}

/// Column metadata with its regexes compiled once per table.
#[derive(Debug)]
pub struct CompiledColumn<'a> {
    pub column: &'a Column,
    pub foreign_key: Option<&'a ForeignKey>,
    pub is_primary_key: bool,
    /// Whole-value matcher for text columns with a regex. `Some(None)` marks a
    /// pattern that does not compile and therefore never matches.
    pub matcher: Option<Option<Regex>>,
    pub sampler: Option<RandRegex>,
}

/// A table prepared for generation.
#[derive(Debug)]
pub struct CompiledTable<'a> {
    pub table: &'a Table,
    pub columns: Vec<CompiledColumn<'a>>,
}

impl<'a> CompiledTable<'a> {
    pub fn new(table: &'a Table) -> Self {
        let columns = table
            .columns
            .iter()
            .map(|column| compile_column(table, column))
            .collect();
        Self { table, columns }
    }

    pub fn name(&self) -> &str {
        &self.table.name
    }
}

fn compile_column<'a>(table: &'a Table, column: &'a Column) -> CompiledColumn<'a> {
    let mut matcher = None;
    let mut sampler = None;

    if column.column_type == ColumnType::Text {
        if let Some(compiled) = column.anchored_regex() {
            matcher = Some(match compiled {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(
                        table = %table.name,
                        column = %column.name,
                        error = %err,
                        "column regex does not compile; values will never match"
                    );
                    None
                }
            });
        }
        if let Some(pattern) = column.regex.as_deref() {
            sampler = RandRegex::compile(&sampler_pattern(pattern), SAMPLER_MAX_REPEAT).ok();
        }
    }

    CompiledColumn {
        column,
        foreign_key: table.foreign_key_for(&column.name),
        is_primary_key: table.is_primary_key(&column.name),
        matcher,
        sampler,
    }
}

/// Rewrite a column regex for sampling. Outer `^`/`$` anchors are dropped
/// (the sampler cannot compile assertions) and `\d`, `\w`, `\s` become their
/// ASCII classes so samples stay printable. Matching still uses the
/// declared pattern.
pub(crate) fn sampler_pattern(pattern: &str) -> String {
    let mut body = pattern.strip_prefix('^').unwrap_or(pattern);
    if let Some(stripped) = body.strip_suffix('$') {
        let escapes = stripped.chars().rev().take_while(|c| *c == '\\').count();
        if escapes % 2 == 0 {
            body = stripped;
        }
    }

    let mut rewritten = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            rewritten.push(c);
            continue;
        }
        match chars.next() {
            Some('d') => rewritten.push_str("[0-9]"),
            Some('w') => rewritten.push_str("[0-9A-Za-z_]"),
            Some('s') => rewritten.push_str("[ ]"),
            Some(other) => {
                rewritten.push('\\');
                rewritten.push(other);
            }
            None => rewritten.push('\\'),
        }
    }
    rewritten
}

/// Committed keys of one table.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    primary_keys: Vec<Value>,
    primary_key_index: HashSet<String>,
    unique: BTreeMap<String, HashSet<String>>,
}

impl TableState {
    /// Primary keys in commit order.
    pub fn primary_keys(&self) -> &[Value] {
        &self.primary_keys
    }

    pub fn has_primary_key(&self, value: &Value) -> bool {
        self.primary_key_index.contains(&value.key())
    }

    pub fn has_unique(&self, column: &str, value: &Value) -> bool {
        self.unique
            .get(column)
            .map(|seen| seen.contains(&value.key()))
            .unwrap_or(false)
    }
}

/// Primary-key pools and unique sets for every table of a run.
///
/// Owned by the generation pass; a table's state is created when the table
/// starts and extended only when a row is committed.
#[derive(Debug, Clone, Default)]
pub struct PoolArena {
    tables: BTreeMap<String, TableState>,
}

impl PoolArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the state for `table` before its rows are generated.
    pub fn begin_table(&mut self, table: &Table) {
        let unique = table
            .columns
            .iter()
            .filter(|column| column.unique)
            .map(|column| (column.name.clone(), HashSet::new()))
            .collect();
        self.tables.insert(
            table.name.clone(),
            TableState {
                unique,
                ..TableState::default()
            },
        );
    }

    pub fn state(&self, table: &str) -> Option<&TableState> {
        self.tables.get(table)
    }

    /// Committed primary keys of `table`; empty for tables not generated yet.
    pub fn pool(&self, table: &str) -> &[Value] {
        self.tables
            .get(table)
            .map(|state| state.primary_keys())
            .unwrap_or(&[])
    }

    pub fn contains_primary_key(&self, table: &str, value: &Value) -> bool {
        self.tables
            .get(table)
            .map(|state| state.has_primary_key(value))
            .unwrap_or(false)
    }

    /// Register a committed row's primary key and unique values.
    pub fn commit(&mut self, table: &Table, row: &Row) {
        let state = self.tables.entry(table.name.clone()).or_default();

        if let Some(value) = table.primary_key.as_deref().and_then(|pk| row.get(pk)) {
            if !value.is_null() && state.primary_key_index.insert(value.key()) {
                state.primary_keys.push(value.clone());
            }
        }

        for (column, seen) in state.unique.iter_mut() {
            if let Some(value) = row.get(column) {
                if !value.is_null() {
                    seen.insert(value.key());
                }
            }
        }
    }
}

/// Per-table generation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub repair_attempts: u64,
    pub exhausted_rows: u64,
}

/// Everything a generation pass produces.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub dataset_id: String,
    pub plan: PlanOutcome,
    pub rows_by_table: BTreeMap<String, Vec<Row>>,
    pub pools: PoolArena,
    pub stats: BTreeMap<String, TableStats>,
}

impl GenerationOutcome {
    /// Tables in generation order.
    pub fn order(&self) -> &[String] {
        self.plan.order()
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.rows_by_table
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_rows(&self) -> u64 {
        self.rows_by_table.values().map(|rows| rows.len() as u64).sum()
    }
}
