//! JSON file backend.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::{DatasetError, DatasetResult, MemoryDataset};

/// Open a dataset file.
pub fn open_dataset(path: impl AsRef<Path>) -> DatasetResult<MemoryDataset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DatasetError::missing_file(path));
    }
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    let mut dataset: MemoryDataset =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Format {
            path: path.to_path_buf(),
            source,
        })?;
    dataset.set_source(path.display().to_string());
    debug!(
        path = %path.display(),
        variables = dataset.variables.len(),
        "Opened dataset"
    );
    Ok(dataset)
}

/// Write a dataset, replacing any existing file at `path`.
pub fn write_dataset(path: impl AsRef<Path>, dataset: &MemoryDataset) -> DatasetResult<()> {
    let path = path.as_ref();
    if path.exists() {
        fs::remove_file(path).map_err(|e| DatasetError::io(path, e))?;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, dataset).map_err(|source| DatasetError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|e| DatasetError::io(path, e))?;
    debug!(
        path = %path.display(),
        variables = dataset.variables.len(),
        "Wrote dataset"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dataset, Variable};
    use tempfile::TempDir;

    #[test]
    fn test_write_then_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.json");
        let ds = MemoryDataset::new("mem")
            .with_attribute("GDNAM", "AUS12")
            .with_variable(
                "NO",
                Variable::new("NO", &["ROW", "COL"], &[1, 2], vec![0.5, 1.5])
                    .unwrap()
                    .with_attr("units", "moles/s"),
            )
            .unwrap();
        write_dataset(&path, &ds).unwrap();

        let back = open_dataset(&path).unwrap();
        assert_eq!(back.source(), path.display().to_string());
        assert_eq!(back.require_variable("NO").unwrap().values(), &[0.5, 1.5]);
        assert_eq!(back.attribute("GDNAM").and_then(|a| a.as_str()), Some("AUS12"));
    }

    #[test]
    fn test_write_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "not json").unwrap();
        write_dataset(&path, &MemoryDataset::new("mem")).unwrap();
        assert!(open_dataset(&path).is_ok());
    }

    #[test]
    fn test_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            open_dataset(&missing),
            Err(DatasetError::MissingFile { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ \"variables\": 3 }").unwrap();
        assert!(matches!(open_dataset(&bad), Err(DatasetError::Format { .. })));
    }
}
