//! Input file discovery by name prefix.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{EmissionsError, Result};

/// A file whose name starts with a known prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedFile {
    pub path: PathBuf,
    /// File name with the prefix removed.
    pub rest: String,
}

/// Files directly inside `dir` whose names start with `prefix`, sorted by
/// name.
pub fn files_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<PrefixedFile>> {
    if !dir.is_dir() {
        return Err(EmissionsError::missing_file("input directory", dir));
    }
    let mut found = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| EmissionsError::Scan {
            dir: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if let Some(rest) = name.strip_prefix(prefix) {
            found.push(PrefixedFile {
                path: entry.path().to_path_buf(),
                rest: rest.to_string(),
            });
        }
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(dir = %dir.display(), prefix = %prefix, count = found.len(), "Scanned for input files");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_prefix_filter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("GRIDCRO2D_b"), "{}").unwrap();
        fs::write(dir.path().join("GRIDCRO2D_a"), "{}").unwrap();
        fs::write(dir.path().join("METCRO3D_a"), "{}").unwrap();
        fs::create_dir(dir.path().join("GRIDCRO2D_dir")).unwrap();

        let found = files_with_prefix(dir.path(), "GRIDCRO2D_").unwrap();
        let rests: Vec<_> = found.iter().map(|f| f.rest.as_str()).collect();
        assert_eq!(rests, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = files_with_prefix(&dir.path().join("nope"), "x").unwrap_err();
        assert!(err.is_missing_input());
    }
}
