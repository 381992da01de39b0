//! Utility functions

use crate::error::{PrepError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Create the parent directory of `file_path` if it does not exist yet
pub fn make_parent_dir(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Resolve `path` against the current directory when it is relative
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// File name of `path` as UTF-8
pub fn file_name_str(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PrepError::InvalidPath(format!("{} has no file name", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_make_parent_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a").join("b").join("file.json");

        make_parent_dir(&file).unwrap();
        assert!(file.parent().unwrap().is_dir());
        make_parent_dir(&file).unwrap();
    }

    #[test]
    fn test_make_parent_dir_bare_name() {
        make_parent_dir(Path::new("file.json")).unwrap();
    }

    #[test]
    fn test_absolute_path() {
        let abs = absolute_path(Path::new("/data/out")).unwrap();
        assert_eq!(abs, PathBuf::from("/data/out"));

        let rel = absolute_path(Path::new("out")).unwrap();
        assert!(rel.is_absolute());
        assert!(rel.ends_with("out"));
    }

    #[test]
    fn test_file_name_str() {
        assert_eq!(file_name_str(Path::new("/a/b/c.nii")).unwrap(), "c.nii");
        assert!(file_name_str(Path::new("/")).is_err());
    }
}
