//! BIDS dataset indexing
//!
//! Only the parts of the BIDS layout this tool needs: subject folders and
//! entity-encoded file names such as `sub-01_ses-pre_run-1_T1w.nii.gz`.

use crate::error::{PrepError, Result};
use crate::metadata::DESCRIPTION_FILE;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Subject folder prefix
pub const SUBJECT_PREFIX: &str = "sub-";

/// Lookup of a subject's anatomical image
pub trait SubjectLookup {
    /// Subject labels, without the `sub-` prefix, sorted
    fn subjects(&self) -> Vec<String>;

    /// T1-weighted NIfTI of `label` in native space
    fn anatomical_t1w(&self, label: &str) -> Result<PathBuf>;
}

/// Strip an optional `sub-` prefix from a participant label
pub fn normalize_label(label: &str) -> &str {
    label.strip_prefix(SUBJECT_PREFIX).unwrap_or(label)
}

/// A file whose name follows the BIDS entity convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidsFile {
    pub path: PathBuf,
    /// Key-value entities, e.g. `sub -> 01`
    pub entities: BTreeMap<String, String>,
    /// Last `_`-separated part of the stem, e.g. `T1w`
    pub suffix: String,
    /// Everything from the first dot, e.g. `.nii.gz`
    pub extension: String,
    /// Name of the containing folder, e.g. `anat`
    pub datatype: Option<String>,
}

impl BidsFile {
    /// Parse `path`; `None` if its name is not a BIDS file name
    pub fn parse(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let dot = name.find('.')?;
        let (stem, extension) = name.split_at(dot);

        let mut parts: Vec<&str> = stem.split('_').collect();
        let suffix = parts.pop()?;
        if suffix.is_empty() || suffix.contains('-') || parts.is_empty() {
            return None;
        }

        let mut entities = BTreeMap::new();
        for part in parts {
            let (key, value) = part.split_once('-')?;
            if key.is_empty() || value.is_empty() {
                return None;
            }
            entities.insert(key.to_string(), value.to_string());
        }
        if !entities.contains_key("sub") {
            return None;
        }

        let datatype = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(str::to_string);

        Some(Self {
            path: path.to_path_buf(),
            entities,
            suffix: suffix.to_string(),
            extension: extension.to_string(),
            datatype,
        })
    }

    pub fn entity(&self, key: &str) -> Option<&str> {
        self.entities.get(key).map(|v| v.as_str())
    }

    /// Native-space T1w NIfTI in an `anat` folder
    pub fn is_native_t1w(&self) -> bool {
        self.suffix == "T1w"
            && self.extension == ".nii.gz"
            && self.entity("space").is_none()
            && self.datatype.as_deref() == Some("anat")
    }
}

/// Index of a raw BIDS dataset
#[derive(Debug, Clone)]
pub struct BidsLayout {
    root: PathBuf,
    subjects: Vec<String>,
    files: Vec<BidsFile>,
}

impl BidsLayout {
    /// Index the dataset rooted at `root`
    pub fn index(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(PrepError::NotFound(format!(
                "BIDS root directory {} does not exist",
                root.display()
            )));
        }
        if !root.join(DESCRIPTION_FILE).is_file() {
            return Err(PrepError::InvalidDataset(format!(
                "{} is missing from {}",
                DESCRIPTION_FILE,
                root.display()
            )));
        }

        let mut subjects = Vec::new();
        let mut files = Vec::new();

        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(label) = name.strip_prefix(SUBJECT_PREFIX) else {
                continue;
            };
            if label.is_empty() || !entry.path().is_dir() {
                continue;
            }
            subjects.push(label.to_string());
            collect_files(&entry.path(), &mut files)?;
        }

        subjects.sort();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(
            "Indexed {} subjects and {} files under {}",
            subjects.len(),
            files.len(),
            root.display()
        );

        Ok(Self {
            root,
            subjects,
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files of one subject matching `predicate`, in path order
    pub fn query<'a, F>(&'a self, label: &str, predicate: F) -> impl Iterator<Item = &'a BidsFile>
    where
        F: Fn(&BidsFile) -> bool + 'a,
    {
        let label = normalize_label(label).to_string();
        self.files
            .iter()
            .filter(move |f| f.entity("sub") == Some(label.as_str()) && predicate(*f))
    }
}

impl SubjectLookup for BidsLayout {
    fn subjects(&self) -> Vec<String> {
        self.subjects.clone()
    }

    fn anatomical_t1w(&self, label: &str) -> Result<PathBuf> {
        self.query(label, BidsFile::is_native_t1w)
            .next()
            .map(|f| f.path.clone())
            .ok_or_else(|| {
                PrepError::NotFound(format!(
                    "Anatomical images not found for subject {}",
                    normalize_label(label)
                ))
            })
    }
}

/// Recursively add every BIDS-named file under `dir`
fn collect_files(dir: &Path, files: &mut Vec<BidsFile>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_str().map_or(true, |n| n.starts_with('.')) {
            continue;
        }

        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if let Some(file) = BidsFile::parse(&path) {
            files.push(file);
        }
    }
    Ok(())
}
