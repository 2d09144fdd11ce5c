// src/storage/unpack.rs

use std::{
    fs::{self, File},
    io,
    path::Path,
};
use tracing::info;
use zip::ZipArchive;

use super::StorageError;

pub fn is_zip(object: &str) -> bool {
    object.to_lowercase().ends_with(".zip")
}

/// Copy the first `.csv` entry of the archive at `zip_path` to `dest`.
/// Returns the entry name.
pub fn extract_first_csv(zip_path: &Path, dest: &Path) -> Result<String, StorageError> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        StorageError::Archive(format!("reading {}: {}", zip_path.display(), e))
    })?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| StorageError::Archive(format!("entry #{}: {}", i, e)))?;
        let name = entry.name().to_string();
        if !entry.is_file() || !name.to_lowercase().ends_with(".csv") {
            continue;
        }

        let mut out = File::create(dest)?;
        let bytes = io::copy(&mut entry, &mut out)?;
        info!(entry = %name, bytes, "extracted {} → {}", zip_path.display(), dest.display());
        return Ok(name);
    }

    Err(StorageError::Archive(format!(
        "no .csv entry in {}",
        zip_path.display()
    )))
}

/// Extract and remove the downloaded archive.
pub fn unpack_into(zip_path: &Path, dest: &Path) -> Result<String, StorageError> {
    let name = extract_first_csv(zip_path, dest)?;
    fs::remove_file(zip_path)?;
    Ok(name)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;
    use zip::{write::SimpleFileOptions, CompressionMethod};

    pub(crate) fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
            for (name, content) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_extracts_first_csv_entry() {
        let tmp = tempdir().unwrap();
        let zip_path = tmp.path().join("data.zip");
        fs::write(
            &zip_path,
            zip_bytes(&[("README.txt", "hello"), ("Hotel.csv", "a,b\n1,2\n")]),
        )
        .unwrap();

        let dest = tmp.path().join("raw.csv");
        let name = unpack_into(&zip_path, &dest).unwrap();
        assert_eq!(name, "Hotel.csv");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "a,b\n1,2\n");
        assert!(!zip_path.exists());
    }

    #[test]
    fn test_archive_without_csv() {
        let tmp = tempdir().unwrap();
        let zip_path = tmp.path().join("data.zip");
        fs::write(&zip_path, zip_bytes(&[("README.txt", "hello")])).unwrap();

        let err = extract_first_csv(&zip_path, &tmp.path().join("raw.csv")).unwrap_err();
        assert!(matches!(err, StorageError::Archive(_)));
        assert!(is_zip("Hotel.ZIP"));
        assert!(!is_zip("Hotel.csv"));
    }
}
