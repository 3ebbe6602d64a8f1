use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value as Json};

use datasmith_core::{Row, Table, Value};

use crate::output::{CountingWriter, OutputError};

/// Write one JSON object per row, keys in column declaration order.
pub fn write_table_jsonl(path: &Path, table: &Table, rows: &[Row]) -> Result<u64, OutputError> {
    let mut writer = CountingWriter::new(BufWriter::new(File::create(path)?));

    for row in rows {
        let mut object = Map::with_capacity(table.columns.len());
        for column in &table.columns {
            let value = row.get(&column.name).unwrap_or(&Value::Null);
            object.insert(column.name.clone(), serde_json::to_value(value)?);
        }
        serde_json::to_writer(&mut writer, &Json::Object(object))?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(writer.bytes_written())
}
