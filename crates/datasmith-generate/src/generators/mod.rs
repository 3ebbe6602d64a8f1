//! Base value generation, one dispatch arm per column type.

pub mod primitives;
pub mod semantic;

use datasmith_core::{ColumnType, Mode, Value};

use crate::model::{CompiledColumn, PoolArena};
use crate::rng::SequenceRng;

/// Sentinel written to a foreign-key column when invalid mode breaks it.
pub const INVALID_FOREIGN_KEY: &str = "invalid_fk";

/// Probability that invalid mode replaces a foreign-key value.
const INVALID_FOREIGN_KEY_RATE: f64 = 0.2;

/// Produce the base value for one column, before edge cases.
///
/// Foreign keys win over the declared type: they sample the referenced
/// table's committed primary keys, or produce null while that pool is empty.
pub fn generate_value(
    compiled: &CompiledColumn<'_>,
    mode: &Mode,
    pools: &PoolArena,
    rng: &mut SequenceRng,
) -> Value {
    if let Some(fk) = compiled.foreign_key {
        if *mode == Mode::Invalid && rng.next_unit() < INVALID_FOREIGN_KEY_RATE {
            return Value::from(INVALID_FOREIGN_KEY);
        }
        return rng
            .choice(pools.pool(&fk.ref_table))
            .cloned()
            .unwrap_or(Value::Null);
    }

    let column = compiled.column;
    match &column.column_type {
        ColumnType::Uuid => Value::Text(primitives::uuid(rng)),
        ColumnType::Int => primitives::int_in_range(column, rng),
        ColumnType::Decimal => primitives::decimal_in_range(column, rng),
        ColumnType::Bool => Value::Bool(rng.next_unit() < 0.5),
        ColumnType::Date => primitives::date_in_range(column, rng),
        ColumnType::Datetime => primitives::timestamp_in_range(column, rng),
        ColumnType::Enum => primitives::enum_value(column, rng),
        ColumnType::Text => match column.regex.as_deref() {
            Some(pattern) => primitives::text_from_regex(pattern, compiled.sampler.as_ref(), rng),
            None => Value::Text(primitives::random_text(column.length, rng)),
        },
        ColumnType::Email => Value::Text(semantic::email(rng)),
        ColumnType::Phone => Value::Text(semantic::phone(rng)),
        ColumnType::Country => Value::Text(semantic::country(rng)),
        ColumnType::PostcodeUk => Value::Text(semantic::postcode_uk(rng)),
        ColumnType::Name => Value::Text(semantic::full_name(rng)),
        ColumnType::Unknown(_) => Value::Text(String::new()),
    }
}
