use datasmith_core::{Bound, Column, ColumnType, Value, parse_instant};

use crate::model::GenerationOptions;
use crate::rng::SequenceRng;

const INVALID_RATE: f64 = 0.2;
const NULL_RATE: f64 = 0.12;
const BOUNDARY_RATE: f64 = 0.15;

/// Optionally override a base value with an invalid placeholder, a null or
/// a boundary value. At most one override applies, tried in that order.
///
/// `options` must already have the dataset mode folded in. Each probability
/// that is actually evaluated consumes one draw.
pub fn apply_edge_cases(
    value: Value,
    column: &Column,
    options: &GenerationOptions,
    rng: &mut SequenceRng,
) -> Value {
    if options.invalid && rng.next_unit() < INVALID_RATE {
        return invalid_value(&column.column_type);
    }
    if column.nullable && options.nulls && rng.next_unit() < NULL_RATE {
        return Value::Null;
    }
    if options.boundary && rng.next_unit() < BOUNDARY_RATE {
        return boundary_value(value, column, rng);
    }
    value
}

/// Type-specific placeholder that no well-formed value of the type equals.
pub fn invalid_value(column_type: &ColumnType) -> Value {
    let sentinel = match column_type {
        ColumnType::Int | ColumnType::Decimal => "not_a_number",
        ColumnType::Date | ColumnType::Datetime => "not_a_date",
        ColumnType::Bool => "not_bool",
        ColumnType::Enum => "INVALID_ENUM",
        ColumnType::Uuid => "not-a-uuid",
        ColumnType::Email => "invalid-email",
        ColumnType::Phone => "invalid-phone",
        ColumnType::PostcodeUk => "INVALID",
        ColumnType::Name => "",
        ColumnType::Text => "!!!",
        ColumnType::Country | ColumnType::Unknown(_) => "invalid",
    };
    Value::from(sentinel)
}

/// Pick an extreme of the column's declared constraint with a coin flip.
/// Columns without a range, length or values keep their base value.
pub fn boundary_value(value: Value, column: &Column, rng: &mut SequenceRng) -> Value {
    match &column.column_type {
        kind if kind.is_numeric() || kind.is_temporal() => {
            let Some(range) = column.range.as_ref() else {
                return value;
            };
            let bound = if rng.next_unit() < 0.5 {
                range.lower()
            } else {
                range.upper()
            };
            bound_value(kind, bound)
        }
        ColumnType::Text => {
            let Some(length) = column.length else {
                return value;
            };
            let target = if rng.next_unit() < 0.5 {
                length.0
            } else {
                length.1
            };
            let mut text: String = value.render().chars().take(target).collect();
            while text.chars().count() < target {
                text.push('x');
            }
            Value::Text(text)
        }
        ColumnType::Enum => {
            let Some(values) = column.values.as_deref().filter(|values| !values.is_empty()) else {
                return value;
            };
            let picked = if rng.next_unit() < 0.5 {
                values.first()
            } else {
                values.last()
            };
            picked.cloned().unwrap_or(value)
        }
        _ => value,
    }
}

fn bound_value(kind: &ColumnType, bound: &Bound) -> Value {
    match kind {
        ColumnType::Int => match bound.as_f64() {
            Some(number) if number.fract() == 0.0 => Value::Int(number as i64),
            Some(number) => Value::Float(number),
            None => Value::Text(bound.as_text()),
        },
        ColumnType::Decimal => match bound.as_f64() {
            Some(number) => Value::Float(number),
            None => Value::Text(bound.as_text()),
        },
        ColumnType::Date => match parse_instant(&bound.as_text()) {
            Some(instant) => Value::Date(instant.date()),
            None => Value::Text(bound.as_text()),
        },
        ColumnType::Datetime => match parse_instant(&bound.as_text()) {
            Some(instant) => Value::Timestamp(instant),
            None => Value::Text(bound.as_text()),
        },
        _ => Value::Text(bound.as_text()),
    }
}
