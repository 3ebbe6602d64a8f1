use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use datasmith_core::{Row, Table};

use crate::output::{CountingWriter, OutputError};

/// Write a table as CSV with a header row in column declaration order.
/// Nulls become empty fields.
pub fn write_table_csv(path: &Path, table: &Table, rows: &[Row]) -> Result<u64, OutputError> {
    let writer = BufWriter::new(File::create(path)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    let header: Vec<&str> = table.columns.iter().map(|col| col.name.as_str()).collect();
    writer.write_record(&header)?;

    for row in rows {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|col| row.get(&col.name).map(|value| value.render()).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}
