//! Table enumeration and CSV serialization

use super::storage::database::Table;

/// Split the configured table list on `,`.
///
/// The split is literal: whitespace around names is kept and empty names
/// survive.
pub fn split_tables(list: &str) -> Vec<String> {
    list.split(',').map(str::to_owned).collect()
}

/// Full-table read. The name is interpolated verbatim so callers may quote it.
pub fn select_all(table: &str) -> String {
    format!("SELECT * FROM {table}")
}

/// Serialize with a header row and no index column. NULL becomes an empty field.
pub fn to_csv(table: &Table) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer
        .into_inner()
        .map_err(|error| csv::Error::from(error.into_error()))
}
