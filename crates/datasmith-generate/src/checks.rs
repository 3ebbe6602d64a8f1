use std::fmt;

use datasmith_core::{ColumnType, Row, Value};

use crate::model::{CompiledColumn, CompiledTable, PoolArena};

/// Why a candidate row was rejected by the repair loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NullNotAllowed { column: String },
    DuplicateUnique { column: String },
    DuplicatePrimaryKey { column: String },
    NotInEnum { column: String },
    OutOfRange { column: String },
    RegexMismatch { column: String },
    DanglingForeignKey { column: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NullNotAllowed { column } => write!(f, "null in non-nullable '{column}'"),
            Rejection::DuplicateUnique { column } => write!(f, "duplicate value in '{column}'"),
            Rejection::DuplicatePrimaryKey { column } => {
                write!(f, "duplicate primary key '{column}'")
            }
            Rejection::NotInEnum { column } => write!(f, "'{column}' outside enum values"),
            Rejection::OutOfRange { column } => write!(f, "'{column}' outside range"),
            Rejection::RegexMismatch { column } => write!(f, "'{column}' does not match regex"),
            Rejection::DanglingForeignKey { column } => {
                write!(f, "'{column}' references a missing key")
            }
        }
    }
}

/// Acceptance predicate for a candidate row. Rules are not consulted.
pub fn check_row(table: &CompiledTable<'_>, row: &Row, pools: &PoolArena) -> Result<(), Rejection> {
    for compiled in &table.columns {
        let value = row.get(&compiled.column.name).unwrap_or(&Value::Null);
        check_column(table.name(), compiled, value, pools)?;
    }
    Ok(())
}

fn check_column(
    table: &str,
    compiled: &CompiledColumn<'_>,
    value: &Value,
    pools: &PoolArena,
) -> Result<(), Rejection> {
    let column = compiled.column;
    let name = || column.name.clone();

    if value.is_null() {
        return if column.nullable {
            Ok(())
        } else {
            Err(Rejection::NullNotAllowed { column: name() })
        };
    }

    let state = pools.state(table);
    if column.unique && state.is_some_and(|state| state.has_unique(&column.name, value)) {
        return Err(Rejection::DuplicateUnique { column: name() });
    }
    if compiled.is_primary_key && state.is_some_and(|state| state.has_primary_key(value)) {
        return Err(Rejection::DuplicatePrimaryKey { column: name() });
    }

    if column.column_type == ColumnType::Enum {
        if let Some(values) = column.values.as_deref() {
            if !in_enum(values, value) {
                return Err(Rejection::NotInEnum { column: name() });
            }
        }
    }

    if column.column_type.is_numeric() {
        if let Some((min, max)) = column.range.as_ref().and_then(|range| range.numeric()) {
            if !in_range(value, min, max) {
                return Err(Rejection::OutOfRange { column: name() });
            }
        }
    }

    if let Some(matcher) = compiled.matcher.as_ref() {
        let matched = matcher
            .as_ref()
            .is_some_and(|regex| regex.is_match(&value.render()));
        if !matched {
            return Err(Rejection::RegexMismatch { column: name() });
        }
    }

    if let Some(fk) = compiled.foreign_key {
        if !pools.contains_primary_key(&fk.ref_table, value) {
            return Err(Rejection::DanglingForeignKey { column: name() });
        }
    }

    Ok(())
}

/// Enum membership by kind: numbers compare numerically, booleans as
/// booleans and everything else as rendered text. `1` is not a member of
/// `["1"]`.
pub fn in_enum(values: &[Value], value: &Value) -> bool {
    values.iter().any(|candidate| enum_member_eq(candidate, value))
}

fn enum_member_eq(candidate: &Value, value: &Value) -> bool {
    match (candidate, value) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(left), Value::Bool(right)) => left == right,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => false,
        (
            Value::Int(_) | Value::Float(_) | Value::Decimal(_),
            Value::Int(_) | Value::Float(_) | Value::Decimal(_),
        ) => candidate.numeric() == value.numeric(),
        (Value::Int(_) | Value::Float(_) | Value::Decimal(_), _)
        | (_, Value::Int(_) | Value::Float(_) | Value::Decimal(_)) => false,
        _ => candidate.render() == value.render(),
    }
}

/// Numeric range membership; numeric text counts as a number.
pub fn in_range(value: &Value, min: f64, max: f64) -> bool {
    value
        .coerce_number()
        .is_some_and(|number| number >= min && number <= max)
}
