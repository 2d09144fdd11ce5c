// src/table/csv_io.rs

use csv::{ReaderBuilder, WriterBuilder};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::{RawTable, Table, TableError};

/// Read a comma-delimited file with a header row.
pub fn read_raw_csv(path: impl AsRef<Path>) -> Result<RawTable, TableError> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(path = %path.display(), rows = rows.len(), cols = headers.len(), "read csv");
    Ok(RawTable { headers, rows })
}

/// Write `table` to `path` (header row, no index column). The file is
/// written beside the destination and renamed over it once complete.
pub fn write_raw_csv(table: &RawTable, path: impl AsRef<Path>) -> Result<(), TableError> {
    let path = path.as_ref();
    let tmp_path = staging_path(path);

    {
        let mut wtr = WriterBuilder::new().from_path(&tmp_path)?;
        wtr.write_record(&table.headers)?;
        for row in &table.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
    }

    fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), rows = table.rows.len(), "wrote csv");
    Ok(())
}

pub fn read_table(path: impl AsRef<Path>) -> Result<Table, TableError> {
    read_raw_csv(path).and_then(|raw| Table::from_raw(&raw))
}

pub fn write_table(table: &Table, path: impl AsRef<Path>) -> Result<(), TableError> {
    write_raw_csv(&table.to_raw(), path)
}

/// `.<name>.tmp` in the same directory as `path`, so the final rename never
/// crosses a filesystem.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
