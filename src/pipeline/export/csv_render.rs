use std::io::Write;

use super::projector::Table;
use super::ExportError;

/// Header row then data rows, nothing else.
pub fn write_table_csv<W: Write>(table: &Table, writer: W) -> Result<W, ExportError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

pub fn table_to_csv(table: &Table) -> Result<Vec<u8>, ExportError> {
    write_table_csv(table, Vec::new())
}

/// File name used for a table inside exports, e.g. `test_cases.csv`.
pub fn csv_file_name(table: &Table) -> String {
    format!("{}.csv", table.name.to_lowercase().replace(' ', "_"))
}
