// src/table/parquet.rs

use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{fs, fs::File, path::Path};
use tracing::debug;

use super::{csv_io::staging_path, Table, TableError};

/// Write `table` as a single SNAPPY-compressed row group.
pub fn write_parquet(table: &Table, path: impl AsRef<Path>) -> Result<(), TableError> {
    let path = path.as_ref();
    let batch = table.batch();
    let tmp_path = staging_path(path);

    let file = File::create(&tmp_path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), rows = batch.num_rows(), "wrote parquet");
    Ok(())
}
