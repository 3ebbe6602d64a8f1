use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::schema::{
    Bound, Column, ColumnRange, ColumnType, DEFAULT_DATASET_NAME, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_SEED, DatasetConfig, Distribution, ForeignKey, LengthRange, Mode, Rule, Schema, Table,
};
use crate::value::Value;

/// Convert a decoded schema document into the canonical [`Schema`].
///
/// Dataset-level scalars are strict; column metadata is taken as-is and
/// malformed pieces are dropped so that generation can still run and the
/// report surfaces the consequences.
pub fn normalize_schema(raw: &Json) -> Result<Schema> {
    let root = raw.as_object().ok_or(SchemaError::NotAnObject)?;

    let tables = match root.get("tables") {
        Some(Json::Object(entries)) => entries
            .iter()
            .map(|(name, table)| normalize_table(name, table))
            .collect(),
        _ => Vec::new(),
    };

    let dataset = normalize_dataset(root.get("dataset"), &tables)?;
    let rules = normalize_rules(root.get("rules"));

    Ok(Schema {
        dataset,
        tables,
        rules,
    })
}

fn normalize_dataset(raw: Option<&Json>, tables: &[Table]) -> Result<DatasetConfig> {
    let empty = Map::new();
    let dataset = match raw {
        Some(Json::Object(map)) => map,
        Some(Json::Null) | None => &empty,
        Some(_) => return Err(SchemaError::invalid_field("dataset", "expected a mapping")),
    };

    let name = dataset
        .get("name")
        .and_then(Json::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DATASET_NAME)
        .to_string();

    let seed = match dataset.get("seed") {
        None | Some(Json::Null) => DEFAULT_SEED,
        Some(value) => read_seed(value)
            .ok_or_else(|| SchemaError::invalid_field("dataset.seed", "expected an integer"))?,
    };

    let mode = dataset
        .get("mode")
        .and_then(Json::as_str)
        .filter(|mode| !mode.is_empty())
        .map(Mode::parse)
        .unwrap_or(Mode::Valid);

    let max_attempts = match dataset.get("max_attempts") {
        None | Some(Json::Null) => DEFAULT_MAX_ATTEMPTS,
        Some(value) => read_unsigned(value)
            .filter(|attempts| *attempts >= 1)
            .and_then(|attempts| u32::try_from(attempts).ok())
            .ok_or_else(|| {
                SchemaError::invalid_field("dataset.max_attempts", "expected an integer >= 1")
            })?,
    };

    let size = normalize_size(dataset.get("size"), tables)?;

    Ok(DatasetConfig {
        name,
        seed,
        mode,
        size,
        max_attempts,
    })
}

fn normalize_size(raw: Option<&Json>, tables: &[Table]) -> Result<BTreeMap<String, u64>> {
    let mut size = BTreeMap::new();
    match raw {
        None | Some(Json::Null) => {}
        Some(Json::Object(entries)) => {
            for (table, count) in entries {
                let rows = read_unsigned(count).ok_or_else(|| {
                    SchemaError::invalid_field(
                        format!("dataset.size.{table}"),
                        "expected a non-negative integer",
                    )
                })?;
                size.insert(table.clone(), rows);
            }
        }
        Some(scalar) => {
            let rows = read_unsigned(scalar).ok_or_else(|| {
                SchemaError::invalid_field("dataset.size", "expected an integer or a mapping")
            })?;
            for table in tables {
                size.insert(table.name.clone(), rows);
            }
        }
    }
    Ok(size)
}

fn normalize_table(name: &str, raw: &Json) -> Table {
    let primary_key = raw
        .get("primary_key")
        .and_then(Json::as_str)
        .map(str::to_string);

    let columns = match raw.get("columns") {
        Some(Json::Object(entries)) => entries
            .iter()
            .map(|(column, raw_column)| normalize_column(column, raw_column))
            .collect(),
        _ => Vec::new(),
    };

    let foreign_keys = match raw.get("foreign_keys") {
        Some(Json::Array(entries)) => entries.iter().filter_map(normalize_foreign_key).collect(),
        _ => Vec::new(),
    };

    Table {
        name: name.to_string(),
        primary_key,
        foreign_keys,
        columns,
    }
}

fn normalize_foreign_key(raw: &Json) -> Option<ForeignKey> {
    let column = raw.get("column").and_then(Json::as_str)?;
    let ref_table = raw.get("ref_table").and_then(Json::as_str)?;
    let ref_column = raw
        .get("ref_column")
        .and_then(Json::as_str)
        .unwrap_or("id");
    Some(ForeignKey {
        column: column.to_string(),
        ref_table: ref_table.to_string(),
        ref_column: ref_column.to_string(),
    })
}

fn normalize_column(name: &str, raw: &Json) -> Column {
    let column_type = match raw.get("type").and_then(Json::as_str) {
        Some(kind) => ColumnType::parse(kind),
        None => ColumnType::Unknown(String::new()),
    };
    let mut column = Column::new(name, column_type);

    column.nullable = raw.get("nullable").and_then(Json::as_bool).unwrap_or(false);
    column.unique = raw.get("unique").and_then(Json::as_bool).unwrap_or(false);
    column.pii = raw.get("pii").and_then(Json::as_bool).unwrap_or(false);
    column.range = raw.get("range").and_then(read_range);
    if column.range.is_none() && raw.get("range").is_some() {
        debug!(column = %name, "dropping malformed range");
    }
    column.distribution = raw
        .get("distribution")
        .and_then(Json::as_str)
        .and_then(Distribution::parse);
    column.regex = raw.get("regex").and_then(Json::as_str).map(str::to_string);
    column.length = raw.get("length").and_then(read_length);
    if column.length.is_none() && raw.get("length").is_some() {
        debug!(column = %name, "dropping malformed length");
    }
    column.values = raw.get("values").and_then(Json::as_array).map(|values| {
        values.iter().map(scalar_value).collect()
    });
    column.weights = raw.get("weights").and_then(Json::as_array).map(|weights| {
        weights
            .iter()
            .map(|weight| weight.as_f64().unwrap_or(0.0))
            .collect()
    });

    column
}

fn read_range(raw: &Json) -> Option<ColumnRange> {
    let items = raw.as_array()?;
    if items.len() != 2 {
        return None;
    }
    Some(ColumnRange(read_bound(&items[0])?, read_bound(&items[1])?))
}

fn read_bound(raw: &Json) -> Option<Bound> {
    match raw {
        Json::Number(number) => number.as_f64().map(Bound::Number),
        Json::String(text) => Some(Bound::Text(text.clone())),
        _ => None,
    }
}

fn read_length(raw: &Json) -> Option<LengthRange> {
    let items = raw.as_array()?;
    if items.len() != 2 {
        return None;
    }
    let min = usize::try_from(items[0].as_u64()?).ok()?;
    let max = usize::try_from(items[1].as_u64()?).ok()?;
    Some(LengthRange(min, max))
}

fn normalize_rules(raw: Option<&Json>) -> Vec<Rule> {
    let Some(Json::Array(entries)) = raw else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let entry = entry.as_object()?;
            let condition = entry
                .get("if")
                .and_then(Json::as_str)
                .unwrap_or_default()
                .to_string();
            let then = match entry.get("then") {
                Some(Json::String(single)) => vec![single.clone()],
                Some(Json::Array(items)) => items
                    .iter()
                    .filter_map(Json::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            Some(Rule { condition, then })
        })
        .collect()
}

/// Integers, integral floats and integer strings are accepted.
fn read_unsigned(raw: &Json) -> Option<u64> {
    match raw {
        Json::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0 && *value >= 0.0 && *value <= u64::MAX as f64)
                .map(|value| value as u64)
        }),
        Json::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Any integer is a seed; negatives wrap onto `u64` (two's complement).
fn read_seed(raw: &Json) -> Option<u64> {
    if let Some(seed) = read_unsigned(raw) {
        return Some(seed);
    }
    let signed = match raw {
        Json::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0 && *value >= i64::MIN as f64)
                .map(|value| value as i64)
        }),
        Json::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    Some(signed as u64)
}

/// Enum members as typed scalars; nested documents become their JSON text.
fn scalar_value(raw: &Json) -> Value {
    match raw {
        Json::Null => Value::Null,
        Json::Bool(flag) => Value::Bool(*flag),
        Json::Number(number) => match number.as_i64() {
            Some(int) => Value::Int(int),
            None => number.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        Json::String(text) => Value::Text(text.clone()),
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fills_dataset_defaults() {
        let schema = normalize_schema(&json!({ "tables": {} })).unwrap();
        assert_eq!(schema.dataset.name, "dataset");
        assert_eq!(schema.dataset.seed, 1);
        assert_eq!(schema.dataset.mode, Mode::Valid);
        assert_eq!(schema.dataset.max_attempts, 10);
        assert!(schema.rules.is_empty());
    }

    #[test]
    fn negative_seed_wraps() {
        let schema = normalize_schema(&json!({ "dataset": { "seed": -5 } })).unwrap();
        assert_eq!(schema.dataset.seed, (-5i64) as u64);
        let from_text = normalize_schema(&json!({ "dataset": { "seed": "-5" } })).unwrap();
        assert_eq!(from_text.dataset.seed, schema.dataset.seed);
        let err = normalize_schema(&json!({ "dataset": { "seed": 1.5 } })).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { ref path, .. } if path == "dataset.seed"));
    }

    #[test]
    fn rejects_non_object_root() {
        let err = normalize_schema(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObject));
    }

    #[test]
    fn rejects_zero_max_attempts() {
        let raw = json!({ "dataset": { "max_attempts": 0 } });
        let err = normalize_schema(&raw).unwrap_err();
        assert!(
            matches!(err, SchemaError::InvalidField { ref path, .. } if path == "dataset.max_attempts")
        );
    }

    #[test]
    fn drops_malformed_column_metadata() {
        let raw = json!({
            "tables": { "t": { "columns": {
                "a": { "type": "int", "range": [1], "length": "long" },
                "b": { "type": "mystery", "values": [1, "x", true] }
            } } }
        });
        let schema = normalize_schema(&raw).unwrap();
        let table = schema.table("t").unwrap();
        let a = table.column("a").unwrap();
        assert!(a.range.is_none());
        assert!(a.length.is_none());
        let b = table.column("b").unwrap();
        assert_eq!(b.column_type, ColumnType::Unknown("mystery".to_string()));
        assert_eq!(
            b.values.as_deref(),
            Some(&[Value::Int(1), Value::from("x"), Value::Bool(true)][..])
        );
    }

    #[test]
    fn pii_flag_is_read_and_only_serialized_when_set() {
        let raw = json!({
            "tables": { "people": { "columns": {
                "email": { "type": "email", "pii": true },
                "age": { "type": "int" }
            } } }
        });
        let schema = normalize_schema(&raw).unwrap();
        let table = schema.table("people").unwrap();
        assert!(table.column("email").unwrap().pii);
        assert!(!table.column("age").unwrap().pii);
        let rendered = serde_json::to_value(table).unwrap();
        assert_eq!(rendered["columns"][0]["pii"], json!(true));
        assert!(rendered["columns"][1].get("pii").is_none());
    }
}
