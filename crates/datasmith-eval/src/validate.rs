//! Re-validation of an exported run directory.
//!
//! Table files are read back in any export format, coerced to the declared
//! column types and evaluated with the same checks as a fresh run.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::{info, warn};

use datasmith_core::value::DATE_FORMAT;
use datasmith_core::{Column, ColumnType, Row, Schema, Table, Value, parse_instant, plan_tables};
use datasmith_generate::{ExportFormat, PoolArena};

use crate::dataset::table_path;
use crate::engine::evaluate_rows;
use crate::errors::EvalError;
use crate::model::QualityReport;

pub const VALIDATION_JSON: &str = "validation.json";

const FORMATS: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Jsonl, ExportFormat::Sql];

const SQL_INSERT: &str = r"^INSERT INTO\s+(\S+)\s*\(([^)]*)\)\s*VALUES\s*\((.*)\);$";

/// An exported run read back from disk and evaluated.
#[derive(Debug, Clone, Serialize)]
pub struct RunValidation {
    pub dir: PathBuf,
    pub format: ExportFormat,
    pub order: Vec<String>,
    /// Tables with no file in the run directory; evaluated as empty.
    pub missing_tables: Vec<String>,
    #[serde(skip)]
    pub rows_by_table: BTreeMap<String, Vec<Row>>,
    pub report: QualityReport,
}

impl RunValidation {
    pub fn rows(&self, table: &str) -> &[Row] {
        self.rows_by_table
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Write `validation.json` next to the table files.
    pub fn write_report(&self) -> Result<PathBuf, EvalError> {
        let path = self.dir.join(VALIDATION_JSON);
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }
}

/// Read the table files in `dir` back and evaluate them against `schema`.
///
/// Without an explicit `format` the first of csv, jsonl and sql with at
/// least one table file present is used.
pub fn validate_run(
    schema: &Schema,
    dir: &Path,
    format: Option<ExportFormat>,
) -> Result<RunValidation, EvalError> {
    let format = match format {
        Some(format) => format,
        None => detect_format(schema, dir)
            .ok_or_else(|| EvalError::NoTableFiles(dir.to_path_buf()))?,
    };
    let sql_insert = Regex::new(SQL_INSERT)?;
    let plan = plan_tables(schema);
    let order = plan.order().to_vec();

    let mut rows_by_table = BTreeMap::new();
    let mut missing_tables = Vec::new();
    let mut pools = PoolArena::new();
    for name in &order {
        let Some(table) = schema.table(name) else {
            continue;
        };
        let path = table_path(dir, name, format);
        let rows = if path.exists() {
            let targets = coercion_targets(schema, table);
            read_table(format, &path, table, &targets, &sql_insert)?
        } else {
            warn!(table = %name, path = %path.display(), "table file not found; evaluating as empty");
            missing_tables.push(name.clone());
            Vec::new()
        };

        pools.begin_table(table);
        for row in &rows {
            pools.commit(table, row);
        }
        info!(table = %name, rows = rows.len(), format = %format, "table read back");
        rows_by_table.insert(name.clone(), rows);
    }

    let mut report = evaluate_rows(schema, &order, &rows_by_table, &pools);
    report.dependency_cycle = plan.offending_edges().map(<[_]>::to_vec);

    Ok(RunValidation {
        dir: dir.to_path_buf(),
        format,
        order,
        missing_tables,
        rows_by_table,
        report,
    })
}

/// First export format with a table file in `dir`.
pub fn detect_format(schema: &Schema, dir: &Path) -> Option<ExportFormat> {
    FORMATS.into_iter().find(|format| {
        schema
            .tables
            .iter()
            .any(|table| table_path(dir, &table.name, *format).exists())
    })
}

/// The column each cell is coerced as. Foreign-key cells take the kind of
/// the key they point at so pool lookups compare like with like.
fn coercion_targets<'a>(schema: &'a Schema, table: &'a Table) -> Vec<&'a Column> {
    table
        .columns
        .iter()
        .map(|column| {
            table
                .foreign_key_for(&column.name)
                .and_then(|fk| {
                    let parent = schema.table(&fk.ref_table)?;
                    parent
                        .column(&fk.ref_column)
                        .or_else(|| parent.primary_key.as_deref().and_then(|pk| parent.column(pk)))
                })
                .unwrap_or(column)
        })
        .collect()
}

fn read_table(
    format: ExportFormat,
    path: &Path,
    table: &Table,
    targets: &[&Column],
    sql_insert: &Regex,
) -> Result<Vec<Row>, EvalError> {
    match format {
        ExportFormat::Csv => read_csv(path, table, targets),
        ExportFormat::Jsonl => read_jsonl(path, table, targets),
        ExportFormat::Sql => read_sql(path, table, targets, sql_insert),
    }
}

fn build_row<'a>(
    table: &Table,
    targets: &[&Column],
    mut cell: impl FnMut(&str) -> Option<&'a Json>,
) -> Row {
    let mut row = Row::with_capacity(table.columns.len());
    for (column, target) in table.columns.iter().zip(targets) {
        let value = cell(&column.name).map_or(Value::Null, |raw| coerce_cell(target, raw));
        row.insert(column.name.clone(), value);
    }
    row
}

fn read_csv(path: &Path, table: &Table, targets: &[&Column]) -> Result<Vec<Row>, EvalError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let headers: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(index, name)| (name.to_lowercase(), index))
        .collect();

    let missing: Vec<&str> = table
        .columns
        .iter()
        .filter(|column| !headers.contains_key(&column.name.to_lowercase()))
        .map(|column| column.name.as_str())
        .collect();
    if !missing.is_empty() {
        warn!(table = %table.name, columns = %missing.join(", "), "columns missing from csv header");
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: HashMap<&str, Json> = table
            .columns
            .iter()
            .filter_map(|column| {
                let index = headers.get(&column.name.to_lowercase())?;
                let cell = record.get(*index)?;
                Some((column.name.as_str(), Json::String(cell.to_string())))
            })
            .collect();
        rows.push(build_row(table, targets, |name| cells.get(name)));
    }
    Ok(rows)
}

fn read_jsonl(path: &Path, table: &Table, targets: &[&Column]) -> Result<Vec<Row>, EvalError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let object: Json = serde_json::from_str(text).map_err(|source| EvalError::JsonRow {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        rows.push(build_row(table, targets, |name| object.get(name)));
    }
    Ok(rows)
}

fn read_sql(
    path: &Path,
    table: &Table,
    targets: &[&Column],
    sql_insert: &Regex,
) -> Result<Vec<Row>, EvalError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let Some(captures) = sql_insert.captures(text) else {
            warn!(path = %path.display(), line = index + 1, "skipping line that is not an insert");
            continue;
        };
        if &captures[1] != table.name.as_str() {
            continue;
        }
        let names = captures[2].split(',').map(str::trim);
        let literals = split_sql_values(&captures[3]);
        let cells: HashMap<&str, Json> = names
            .zip(literals.iter().map(|literal| parse_sql_literal(literal)))
            .collect();
        rows.push(build_row(table, targets, |name| cells.get(name)));
    }
    Ok(rows)
}

/// Split a `VALUES (...)` body on commas outside single-quoted strings.
pub fn split_sql_values(body: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    for c in body.chars() {
        match c {
            '\'' => {
                in_string = !in_string;
                current.push(c);
            }
            ',' if !in_string => {
                values.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !values.is_empty() {
        values.push(current.trim().to_string());
    }
    values
}

/// One SQL literal as JSON. Decimal literals stay text so their scale
/// survives.
pub fn parse_sql_literal(literal: &str) -> Json {
    let literal = literal.trim();
    if literal.eq_ignore_ascii_case("null") {
        return Json::Null;
    }
    if let Some(inner) = literal.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')) {
        return Json::String(inner.replace("''", "'"));
    }
    if literal.eq_ignore_ascii_case("true") {
        return Json::Bool(true);
    }
    if literal.eq_ignore_ascii_case("false") {
        return Json::Bool(false);
    }
    match literal.parse::<i64>() {
        Ok(int) => Json::from(int),
        Err(_) => Json::String(literal.to_string()),
    }
}

/// Coerce a cell read from disk into the value the generator would have
/// produced for `column`. Cells that do not parse as the declared kind are
/// kept as text so the type check flags them.
pub fn coerce_cell(column: &Column, raw: &Json) -> Value {
    match raw {
        Json::Null => return Value::Null,
        Json::String(text) if is_null_text(text) => return Value::Null,
        _ => {}
    }

    match &column.column_type {
        ColumnType::Int => read_number(raw, false),
        ColumnType::Decimal => read_number(raw, true),
        ColumnType::Bool => read_bool(raw),
        ColumnType::Date => {
            let text = scalar_text(raw);
            NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .map(Value::Date)
                .unwrap_or(Value::Text(text))
        }
        ColumnType::Datetime => {
            let text = scalar_text(raw);
            parse_instant(&text)
                .map(Value::Timestamp)
                .unwrap_or(Value::Text(text))
        }
        ColumnType::Enum => {
            let text = scalar_text(raw);
            column
                .values
                .as_deref()
                .and_then(|values| values.iter().find(|member| member.render() == text))
                .cloned()
                .unwrap_or_else(|| scalar_value(raw))
        }
        _ => Value::Text(scalar_text(raw)),
    }
}

fn is_null_text(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}

fn scalar_text(raw: &Json) -> String {
    match raw {
        Json::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn scalar_value(raw: &Json) -> Value {
    match raw {
        Json::Bool(flag) => Value::Bool(*flag),
        Json::Number(number) => match number.as_i64() {
            Some(int) => Value::Int(int),
            None => number
                .as_f64()
                .map(Value::Float)
                .unwrap_or_else(|| Value::Text(number.to_string())),
        },
        other => Value::Text(scalar_text(other)),
    }
}

fn read_number(raw: &Json, decimal: bool) -> Value {
    let Json::String(text) = raw else {
        return scalar_value(raw);
    };
    let trimmed = text.trim();
    if !decimal {
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::Int(int);
        }
    }
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() && decimal => Value::Decimal(trimmed.to_string()),
        Ok(number) if number.is_finite() => Value::Float(number),
        _ => Value::Text(text.clone()),
    }
}

fn read_bool(raw: &Json) -> Value {
    match raw {
        Json::Bool(flag) => Value::Bool(*flag),
        Json::Number(number) => match number.as_i64() {
            Some(1) => Value::Bool(true),
            Some(0) => Value::Bool(false),
            _ => Value::Text(number.to_string()),
        },
        Json::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "t" | "1" => Value::Bool(true),
            "false" | "f" | "0" => Value::Bool(false),
            _ => Value::Text(text.clone()),
        },
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_values_split_outside_quotes() {
        let values = split_sql_values("'a,b', 'O''Brien', NULL, 3, 1.50, TRUE");
        assert_eq!(values, ["'a,b'", "'O''Brien'", "NULL", "3", "1.50", "TRUE"]);
        assert_eq!(parse_sql_literal(&values[0]), Json::from("a,b"));
        assert_eq!(parse_sql_literal(&values[1]), Json::from("O'Brien"));
        assert_eq!(parse_sql_literal(&values[2]), Json::Null);
        assert_eq!(parse_sql_literal(&values[3]), Json::from(3));
        assert_eq!(parse_sql_literal(&values[4]), Json::from("1.50"));
        assert_eq!(parse_sql_literal(&values[5]), Json::Bool(true));
        assert!(split_sql_values("").is_empty());
    }

    #[test]
    fn cells_coerce_by_declared_kind() {
        let int = Column::new("n", ColumnType::Int);
        assert_eq!(coerce_cell(&int, &Json::from("42")), Value::Int(42));
        assert_eq!(coerce_cell(&int, &Json::from("abc")), Value::from("abc"));
        assert_eq!(coerce_cell(&int, &Json::from("")), Value::Null);

        let decimal = Column::new("d", ColumnType::Decimal);
        assert_eq!(
            coerce_cell(&decimal, &Json::from("12.30")),
            Value::Decimal("12.30".to_string())
        );

        let flag = Column::new("b", ColumnType::Bool);
        assert_eq!(coerce_cell(&flag, &Json::from("TRUE")), Value::Bool(true));
        assert_eq!(coerce_cell(&flag, &Json::from("maybe")), Value::from("maybe"));

        let day = Column::new("day", ColumnType::Date);
        assert_eq!(
            coerce_cell(&day, &Json::from("2024-02-29")),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(coerce_cell(&day, &Json::from("not_a_date")), Value::from("not_a_date"));
    }

    #[test]
    fn enum_cells_resolve_to_declared_members() {
        let mut level = Column::new("level", ColumnType::Enum);
        level.values = Some(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(coerce_cell(&level, &Json::from("2")), Value::Int(2));
        assert_eq!(coerce_cell(&level, &Json::from(1)), Value::Int(1));
        assert_eq!(coerce_cell(&level, &Json::from("3")), Value::from("3"));
    }
}
