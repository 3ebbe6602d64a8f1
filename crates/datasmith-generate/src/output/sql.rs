use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use datasmith_core::{Row, Table, Value};

use crate::output::{CountingWriter, OutputError};

/// Write one `INSERT` statement per row.
pub fn write_table_sql(path: &Path, table: &Table, rows: &[Row]) -> Result<u64, OutputError> {
    let mut writer = CountingWriter::new(BufWriter::new(File::create(path)?));
    let columns: Vec<&str> = table.columns.iter().map(|col| col.name.as_str()).collect();
    let columns = columns.join(", ");

    for row in rows {
        let values: Vec<String> = table
            .columns
            .iter()
            .map(|col| sql_literal(row.get(&col.name).unwrap_or(&Value::Null)))
            .collect();
        writeln!(
            writer,
            "INSERT INTO {} ({columns}) VALUES ({});",
            table.name,
            values.join(", ")
        )?;
    }

    writer.flush()?;
    Ok(writer.bytes_written())
}

/// `NULL`, bare numbers and booleans, single-quoted text with `''` escaping.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(_) | Value::Decimal(_) => value.render(),
        Value::Float(number) if number.is_finite() => value.render(),
        other => format!("'{}'", other.render().replace('\'', "''")),
    }
}
