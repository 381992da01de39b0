//! Run configuration
//!
//! Everything a run needs is carried explicitly in a [`RunConfig`]; nothing is
//! read from process-wide state after argument parsing.

use crate::bids::normalize_label;
use crate::command::{DEFAULT_IMAGE, DEFAULT_SIF, DEFAULT_THREADS};
use crate::error::{PrepError, Result};
use crate::types::{AnalysisLevel, ContainerEngine, Resolution};
use crate::utils::absolute_path;
use std::path::PathBuf;

/// Settings for preparing one participant
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Raw BIDS dataset root
    pub bids_dir: PathBuf,

    /// Output root for pipeline derivatives
    pub derivatives_dir: PathBuf,

    /// BIDS-App analysis level, if given
    pub analysis_level: Option<AnalysisLevel>,

    /// Participant to process, with or without `sub-`
    pub participant_label: String,

    /// FreeSurfer license, needed for surface reconstruction
    pub fs_license: Option<PathBuf>,

    /// Engines to print commands for, in order
    pub engines: Vec<ContainerEngine>,

    /// Only run the segmentation network, no surfaces
    pub seg_only: bool,

    /// Docker image reference
    pub image: String,

    /// Singularity image file
    pub sif: PathBuf,

    /// Threads passed to FastSurfer
    pub threads: usize,

    /// Smallest voxel size FastSurfer is given
    pub min_resolution: Resolution,
}

impl RunConfig {
    /// Create a configuration with default pipeline settings
    pub fn new(
        bids_dir: impl Into<PathBuf>,
        derivatives_dir: impl Into<PathBuf>,
        participant_label: impl Into<String>,
    ) -> Self {
        Self {
            bids_dir: bids_dir.into(),
            derivatives_dir: derivatives_dir.into(),
            analysis_level: None,
            participant_label: participant_label.into(),
            fs_license: None,
            engines: Vec::new(),
            seg_only: false,
            image: DEFAULT_IMAGE.to_string(),
            sif: PathBuf::from(DEFAULT_SIF),
            threads: DEFAULT_THREADS,
            min_resolution: Resolution::DEFAULT_FLOOR,
        }
    }

    pub fn with_analysis_level(mut self, level: AnalysisLevel) -> Self {
        self.analysis_level = Some(level);
        self
    }

    pub fn with_fs_license(mut self, license: impl Into<PathBuf>) -> Self {
        self.fs_license = Some(license.into());
        self
    }

    /// Add an engine; duplicates are ignored
    pub fn with_engine(mut self, engine: ContainerEngine) -> Self {
        if !self.engines.contains(&engine) {
            self.engines.push(engine);
        }
        self
    }

    pub fn with_seg_only(mut self, seg_only: bool) -> Self {
        self.seg_only = seg_only;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_sif(mut self, sif: impl Into<PathBuf>) -> Self {
        self.sif = sif.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_min_resolution(mut self, resolution: Resolution) -> Self {
        self.min_resolution = resolution;
        self
    }

    /// Resolve dataset, derivatives and license paths against the current
    /// directory so they can be bind-mounted
    pub fn with_absolute_paths(mut self) -> Result<Self> {
        self.bids_dir = absolute_path(&self.bids_dir)?;
        self.derivatives_dir = absolute_path(&self.derivatives_dir)?;
        if let Some(license) = &self.fs_license {
            self.fs_license = Some(absolute_path(license)?);
        }
        Ok(self)
    }

    /// Participant label without the `sub-` prefix
    pub fn label(&self) -> &str {
        normalize_label(&self.participant_label)
    }

    /// Check the configuration describes exactly one runnable participant
    pub fn validate(&self) -> Result<()> {
        let label = self.label();
        if label.is_empty() {
            return Err(PrepError::MissingField("participant_label".to_string()));
        }
        if label.contains(|c: char| c.is_whitespace() || c == ',') {
            return Err(PrepError::Configuration(
                "Only one participant_label is currently supported.".to_string(),
            ));
        }

        if self.analysis_level == Some(AnalysisLevel::Group) {
            return Err(PrepError::Configuration(
                "group level analysis is not supported; run one participant at a time"
                    .to_string(),
            ));
        }

        if !self.seg_only {
            let license = self.fs_license.as_ref().ok_or_else(|| {
                PrepError::MissingField(
                    "fs_license is required unless --seg_only is set".to_string(),
                )
            })?;
            if !license.is_file() {
                return Err(PrepError::NotFound(format!(
                    "License file {} not found.",
                    license.display()
                )));
            }
        }

        if self.threads == 0 {
            return Err(PrepError::Configuration(
                "threads must be at least 1".to_string(),
            ));
        }

        if !self.min_resolution.is_valid() {
            return Err(PrepError::Configuration(format!(
                "minimum resolution must be positive, got {}",
                self.min_resolution
            )));
        }

        Ok(())
    }
}
