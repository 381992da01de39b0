//! Container command lines for FastSurfer
//!
//! The anatomical folder is mounted at `/data`, the derivatives root at
//! `/output` and, for full runs, the license folder at `/fs_license`.

use crate::config::RunConfig;
use crate::error::{PrepError, Result};
use crate::types::ContainerEngine;
use crate::utils::file_name_str;
use std::fmt;
use std::path::{Path, PathBuf};

/// Docker image run by default
pub const DEFAULT_IMAGE: &str = "deepmi/fastsurfer:latest";

/// Singularity image file used by default
pub const DEFAULT_SIF: &str = "fastsurfer-gpu.sif";

/// FastSurfer `--threads` default
pub const DEFAULT_THREADS: usize = 2;

/// Entry point inside the Singularity image
const SINGULARITY_ENTRYPOINT: &str = "/fastsurfer/run_fastsurfer.sh";

/// Folder and file name of a mounted file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub dir: PathBuf,
    pub file: String,
}

impl Mount {
    /// Split `path` into its folder and file name
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = file_name_str(path)?.to_string();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self { dir, file })
    }
}

/// A FastSurfer invocation for one engine
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerCommand {
    pub engine: ContainerEngine,
    /// Anatomical input, after resolution normalization
    pub anat: Mount,
    pub derivatives_dir: PathBuf,
    /// Label without `sub-`
    pub participant_label: String,
    /// `None` runs segmentation only
    pub license: Option<Mount>,
    pub image: String,
    pub sif: PathBuf,
    pub threads: usize,
}

impl ContainerCommand {
    /// Command running `config`'s pipeline on `anat_path` with `engine`
    pub fn for_run(engine: ContainerEngine, config: &RunConfig, anat_path: &Path) -> Result<Self> {
        let license = if config.seg_only {
            None
        } else {
            let path = config.fs_license.as_ref().ok_or_else(|| {
                PrepError::MissingField(
                    "fs_license is required unless --seg_only is set".to_string(),
                )
            })?;
            Some(Mount::from_path(path)?)
        };

        Ok(Self {
            engine,
            anat: Mount::from_path(anat_path)?,
            derivatives_dir: config.derivatives_dir.clone(),
            participant_label: config.label().to_string(),
            license,
            image: config.image.clone(),
            sif: config.sif.clone(),
            threads: config.threads,
        })
    }

    pub fn is_seg_only(&self) -> bool {
        self.license.is_none()
    }

    /// Engine invocation up to and including the image
    fn launcher(&self) -> String {
        let anat_dir = self.anat.dir.display();
        let output = self.derivatives_dir.display();

        match (self.engine, &self.license) {
            (ContainerEngine::Docker, None) => format!(
                "sudo docker run --gpus all -v {}:/data -v {}:/output --rm --user $(id -u):$(id -g) {}",
                anat_dir, output, self.image
            ),
            (ContainerEngine::Docker, Some(license)) => format!(
                "sudo docker run --gpus all -v {}:/data -v {}:/output -v {}:/fs_license --rm --user $(id -u):$(id -g) {}",
                anat_dir,
                output,
                license.dir.display(),
                self.image
            ),
            (ContainerEngine::Singularity, None) => format!(
                "singularity exec --nv --no-home -B {}:/data -B {}:/output {} {}",
                anat_dir,
                output,
                self.sif.display(),
                SINGULARITY_ENTRYPOINT
            ),
            (ContainerEngine::Singularity, Some(license)) => format!(
                "singularity exec --nv --no-home -B {}:/data -B {}:/output -B {}:/fs_license {} {}",
                anat_dir,
                output,
                license.dir.display(),
                self.sif.display(),
                SINGULARITY_ENTRYPOINT
            ),
        }
    }

    /// FastSurfer arguments, paths as seen inside the container
    fn fastsurfer_args(&self) -> String {
        let sid = format!("sub-{}", self.participant_label);
        match &self.license {
            None => format!(
                "--t1 /data/{anat} --asegdkt_segfile /output/{sid}/aparc.DKTatlas+aseg.deep.mgz --conformed_name /output/{sid}/conformed.mgz --sd /output --sid {sid} --seg_only --3T --threads {threads}",
                anat = self.anat.file,
                sid = sid,
                threads = self.threads
            ),
            Some(license) => format!(
                "--fs_license /fs_license/{lic} --t1 /data/{anat} --sid {sid} --sd /output --3T --threads {threads}",
                lic = license.file,
                anat = self.anat.file,
                sid = sid,
                threads = self.threads
            ),
        }
    }
}

impl fmt::Display for ContainerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.launcher(), self.fastsurfer_args())
    }
}
