//! Derivatives dataset metadata
//!
//! BIDS tools only index a derivatives folder once it carries a
//! `dataset_description.json` naming the pipeline that produced it.

use crate::error::Result;
use crate::utils::make_parent_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// BIDS version the derivatives claim to follow
pub const BIDS_VERSION: &str = "1.6.0";

/// Pipeline name written into the description
pub const PIPELINE_NAME: &str = "bids_fastsurfer";

/// Pipeline version written into the description
pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where the pipeline code lives
pub const PIPELINE_CODE_URL: &str = "https://github.com/ln2t/bids_fastsurfer";

/// File name BIDS expects at the dataset root
pub const DESCRIPTION_FILE: &str = "dataset_description.json";

/// Contents of `dataset_description.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescription {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "BIDSVersion")]
    pub bids_version: String,

    #[serde(rename = "PipelineDescription")]
    pub pipeline: PipelineDescription,
}

/// Pipeline that generated a derivatives dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDescription {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Version")]
    pub version: String,

    #[serde(rename = "CodeURL")]
    pub code_url: String,
}

impl DatasetDescription {
    /// Description for this pipeline's derivatives
    pub fn for_pipeline() -> Self {
        Self {
            name: PIPELINE_NAME.to_string(),
            bids_version: BIDS_VERSION.to_string(),
            pipeline: PipelineDescription {
                name: PIPELINE_NAME.to_string(),
                version: PIPELINE_VERSION.to_string(),
                code_url: PIPELINE_CODE_URL.to_string(),
            },
        }
    }

    /// Serialize as JSON indented by four spaces
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Write `dataset_description.json` into `output_dir`, creating it if needed
pub fn write_dataset_description(output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(DESCRIPTION_FILE);
    make_parent_dir(&path)?;
    fs::write(&path, DatasetDescription::for_pipeline().to_json()?)?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_description_json_layout() {
        let json = DatasetDescription::for_pipeline().to_json().unwrap();
        let expected = "{\n    \"Name\": \"bids_fastsurfer\",\n    \"BIDSVersion\": \"1.6.0\",\n    \"PipelineDescription\": {\n        \"Name\": \"bids_fastsurfer\",\n        \"Version\": \"1.0.0\",\n        \"CodeURL\": \"https://github.com/ln2t/bids_fastsurfer\"\n    }\n}";
        assert_eq!(json, expected);
    }

    #[test]
    fn test_write_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("derivatives").join("fastsurfer");

        let path = write_dataset_description(&out).unwrap();
        assert_eq!(path, out.join(DESCRIPTION_FILE));

        let parsed: DatasetDescription =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, DatasetDescription::for_pipeline());

        // rewriting is fine
        write_dataset_description(&out).unwrap();
    }
}
