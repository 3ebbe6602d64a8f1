//! Schema inference from a sample CSV.
//!
//! Each column is profiled on its non-empty cells: the first kind every
//! cell satisfies wins, in the order email, phone, uuid, int, decimal,
//! bool, date, datetime, enum, text.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value as Json, json};
use tracing::{debug, info};

use datasmith_core::parse_instant;
use datasmith_core::value::DATE_FORMAT;

use crate::errors::EvalError;

const INFERRED_SEED: u64 = 42;
const INFERRED_MAX_ATTEMPTS: u32 = 10;
/// Columns with at most this many distinct values may become enums.
const ENUM_MAX_DISTINCT: usize = 10;
/// ...and only when distinct values are at most this share of the cells.
const ENUM_MAX_SHARE: f64 = 0.2;
const EMPTY_TEXT_LENGTH: [u64; 2] = [1, 10];

/// Recognizes personal data by shape.
#[derive(Debug, Clone)]
pub struct PiiDetector {
    email: Regex,
    phone: Regex,
}

impl PiiDetector {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            email: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?,
            phone: Regex::new(r"^\+?[0-9][0-9\-\s]{6,}$")?,
        })
    }

    pub fn is_email(&self, value: &str) -> bool {
        self.email.is_match(value.trim())
    }

    /// A bare run of digits is a number, not a phone number.
    pub fn is_phone(&self, value: &str) -> bool {
        let value = value.trim();
        self.phone.is_match(value) && !value.chars().all(|c| c.is_ascii_digit())
    }

    pub fn is_pii(&self, value: &str) -> bool {
        self.is_email(value) || self.is_phone(value)
    }
}

/// Infer a schema document from the CSV at `path`. The dataset and its
/// single table are named after the file stem.
pub fn infer_schema_from_csv(path: &Path) -> Result<Json, EvalError> {
    let table_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("sample")
        .to_string();
    infer_schema(&table_name, File::open(path)?)
}

/// Infer a schema document from CSV text with a header row.
///
/// The document uses the same layout schema files do, so it can be edited
/// and fed straight back to `generate`.
pub fn infer_schema<R: Read>(table_name: &str, source: R) -> Result<Json, EvalError> {
    let detector = PiiDetector::new()?;
    let uuid_shape = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(source);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut row_count: u64 = 0;
    for record in reader.records() {
        let record = record?;
        for (index, column) in cells.iter_mut().enumerate() {
            column.push(record.get(index).unwrap_or_default().to_string());
        }
        row_count += 1;
    }
    if row_count == 0 {
        return Err(EvalError::EmptySample(table_name.to_string()));
    }

    let mut columns = Map::new();
    for (name, values) in headers.iter().zip(&cells) {
        let spec = infer_column(values, &detector, &uuid_shape);
        debug!(column = %name, kind = %spec["type"], "column inferred");
        columns.insert(name.clone(), spec);
    }

    let mut table = Map::new();
    if let Some(primary_key) = pick_primary_key(&columns) {
        table.insert("primary_key".to_string(), Json::from(primary_key));
    }
    table.insert("columns".to_string(), Json::Object(columns));

    let mut size = Map::new();
    size.insert(table_name.to_string(), Json::from(row_count));
    let mut tables = Map::new();
    tables.insert(table_name.to_string(), Json::Object(table));

    info!(table = %table_name, rows = row_count, columns = headers.len(), "schema inferred");
    Ok(json!({
        "dataset": {
            "name": table_name,
            "seed": INFERRED_SEED,
            "mode": "valid",
            "size": Json::Object(size),
            "max_attempts": INFERRED_MAX_ATTEMPTS
        },
        "tables": Json::Object(tables),
        "rules": []
    }))
}

fn infer_column(values: &[String], detector: &PiiDetector, uuid_shape: &Regex) -> Json {
    let present: Vec<&str> = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();
    let nullable = present.len() < values.len();
    if present.is_empty() {
        return json!({ "type": "text", "nullable": true, "length": EMPTY_TEXT_LENGTH });
    }

    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for value in present.iter().copied() {
        *counts.entry(value).or_insert(0) += 1;
    }
    let all_distinct = counts.len() == present.len();
    let unique = all_distinct && !nullable;

    if present.iter().all(|value| detector.is_email(value)) {
        return json!({ "type": "email", "nullable": nullable, "unique": unique, "pii": true });
    }
    if present.iter().all(|value| detector.is_phone(value)) {
        return json!({ "type": "phone", "nullable": nullable, "pii": true });
    }
    if present.iter().all(|value| uuid_shape.is_match(value)) {
        return json!({ "type": "uuid", "nullable": nullable, "unique": unique });
    }

    let ints: Option<Vec<i64>> = present.iter().map(|value| value.parse().ok()).collect();
    if let Some((min, max)) = ints.as_deref().and_then(bounds) {
        return json!({ "type": "int", "nullable": nullable, "unique": unique, "range": [min, max] });
    }
    let floats: Option<Vec<f64>> = present
        .iter()
        .map(|value| value.parse::<f64>().ok().filter(|number| number.is_finite()))
        .collect();
    if let Some(floats) = floats {
        let min = floats.iter().copied().fold(f64::INFINITY, f64::min);
        let max = floats.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        return json!({ "type": "decimal", "nullable": nullable, "range": [min, max] });
    }
    if present.iter().all(|value| {
        matches!(value.to_lowercase().as_str(), "true" | "false" | "1" | "0")
    }) {
        return json!({ "type": "bool", "nullable": nullable });
    }

    let dates: Option<Vec<NaiveDate>> = present
        .iter()
        .map(|value| NaiveDate::parse_from_str(value, DATE_FORMAT).ok())
        .collect();
    if let Some((min, max)) = dates.as_deref().and_then(bounds) {
        return json!({
            "type": "date",
            "nullable": nullable,
            "range": [min.format(DATE_FORMAT).to_string(), max.format(DATE_FORMAT).to_string()]
        });
    }
    let instants: Option<Vec<_>> = present.iter().map(|value| parse_instant(value)).collect();
    if let Some((min, max)) = instants.as_deref().and_then(bounds) {
        return json!({
            "type": "datetime",
            "nullable": nullable,
            "range": [
                min.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
                max.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
            ]
        });
    }

    let total = present.len() as f64;
    if counts.len() <= ENUM_MAX_DISTINCT && counts.len() as f64 / total <= ENUM_MAX_SHARE {
        let members: Vec<&str> = counts.keys().copied().collect();
        let weights: Vec<f64> = counts.values().map(|count| *count as f64 / total).collect();
        return json!({ "type": "enum", "nullable": nullable, "values": members, "weights": weights });
    }

    let lengths = present.iter().map(|value| value.chars().count() as u64);
    let min_length = lengths.clone().min().unwrap_or(EMPTY_TEXT_LENGTH[0]);
    let max_length = lengths.max().unwrap_or(EMPTY_TEXT_LENGTH[1]);
    let mut spec = json!({
        "type": "text",
        "nullable": nullable,
        "unique": unique,
        "length": [min_length, max_length]
    });
    if present.iter().any(|value| detector.is_pii(value)) {
        spec["pii"] = Json::Bool(true);
    }
    spec
}

fn bounds<T: Ord + Copy>(values: &[T]) -> Option<(T, T)> {
    Some((*values.iter().min()?, *values.iter().max()?))
}

/// A unique column named `id`, else the first unique column, else the
/// first column.
fn pick_primary_key(columns: &Map<String, Json>) -> Option<String> {
    columns
        .iter()
        .find(|(name, spec)| name.eq_ignore_ascii_case("id") && is_unique(spec))
        .or_else(|| columns.iter().find(|(_, spec)| is_unique(spec)))
        .or_else(|| columns.iter().next())
        .map(|(name, _)| name.clone())
}

fn is_unique(spec: &Json) -> bool {
    spec.get("unique").and_then(Json::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_shapes_exclude_plain_numbers() {
        let detector = PiiDetector::new().unwrap();
        assert!(detector.is_phone("+44 20 7946 0958"));
        assert!(detector.is_phone("555-123-4567"));
        assert!(!detector.is_phone("5551234567"));
        assert!(detector.is_email(" ada@example.org "));
        assert!(!detector.is_email("ada@example"));
    }

    #[test]
    fn kinds_follow_detection_order() {
        let detector = PiiDetector::new().unwrap();
        let uuid = Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap();
        let kind = |values: &[&str]| {
            let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            infer_column(&values, &detector, &uuid)["type"].clone()
        };
        assert_eq!(kind(&["1", "0", "1"]), json!("int"));
        assert_eq!(kind(&["1.5", "2"]), json!("decimal"));
        assert_eq!(kind(&["true", "FALSE"]), json!("bool"));
        assert_eq!(kind(&["2024-01-05", "2023-12-31"]), json!("date"));
        assert_eq!(kind(&["2024-01-05T10:00:00Z", "2024-01-05 11:30:00"]), json!("datetime"));
        assert_eq!(kind(&["", ""]), json!("text"));
    }

    #[test]
    fn bounds_are_ordered() {
        assert_eq!(bounds(&[3, -1, 7]), Some((-1, 7)));
        assert_eq!(bounds::<i64>(&[]), None);
    }
}
