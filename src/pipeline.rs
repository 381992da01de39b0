//! End-to-end preparation of one participant

use crate::bids::SubjectLookup;
use crate::command::ContainerCommand;
use crate::config::RunConfig;
use crate::error::{PrepError, Result};
use crate::normalize::{ensure_min_resolution, NormalizeOutcome};
use std::path::PathBuf;
use tracing::info;

/// Everything needed to launch FastSurfer for one participant
#[derive(Debug, Clone, PartialEq)]
pub struct Preparation {
    /// T1w found in the dataset
    pub anat_path: PathBuf,
    /// Input actually handed to FastSurfer, plus any quality advisory
    pub outcome: NormalizeOutcome,
    /// One command per configured engine
    pub commands: Vec<ContainerCommand>,
}

/// Validate `config`, locate the participant's T1w through `lookup`, bring it
/// to the minimum resolution and build the container commands.
pub fn prepare(config: &RunConfig, lookup: &dyn SubjectLookup) -> Result<Preparation> {
    config.validate()?;

    let label = config.label();
    let subjects = lookup.subjects();
    if !subjects.iter().any(|s| s == label) {
        return Err(PrepError::UnknownParticipant {
            label: label.to_string(),
            available: subjects,
        });
    }

    let anat_path = lookup.anatomical_t1w(label)?;
    info!("Using anatomical image {}", anat_path.display());

    let outcome = ensure_min_resolution(
        &anat_path,
        &config.derivatives_dir,
        config.min_resolution,
    )?;

    let commands = config
        .engines
        .iter()
        .map(|engine| ContainerCommand::for_run(*engine, config, &outcome.output_path))
        .collect::<Result<Vec<_>>>()?;

    Ok(Preparation {
        anat_path,
        outcome,
        commands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Affine;
    use crate::types::ContainerEngine;
    use crate::volume::Volume;
    use ndarray::Array3;
    use nifti::NiftiHeader;
    use std::path::Path;
    use tempfile::TempDir;

    struct FixedLookup {
        anat: PathBuf,
    }

    impl SubjectLookup for FixedLookup {
        fn subjects(&self) -> Vec<String> {
            vec!["01".to_string(), "02".to_string()]
        }

        fn anatomical_t1w(&self, label: &str) -> Result<PathBuf> {
            if label == "01" {
                Ok(self.anat.clone())
            } else {
                Err(PrepError::NotFound(format!(
                    "Anatomical images not found for subject {}",
                    label
                )))
            }
        }
    }

    fn write_volume(path: &Path, spacing: [f64; 3]) {
        let volume = Volume::new(
            NiftiHeader::default(),
            Affine::axis_aligned(spacing, [0.0; 3]),
            Array3::from_elem((6, 6, 6), 100.0),
        );
        volume.save(path).unwrap();
    }

    #[test]
    fn test_prepare_pass_through() {
        let temp_dir = TempDir::new().unwrap();
        let anat = temp_dir.path().join("sub-01_T1w.nii.gz");
        write_volume(&anat, [1.0, 1.0, 1.0]);
        let out = temp_dir.path().join("out");

        let config = RunConfig::new(temp_dir.path(), &out, "sub-01")
            .with_seg_only(true)
            .with_engine(ContainerEngine::Docker)
            .with_engine(ContainerEngine::Singularity);
        let prep = prepare(&config, &FixedLookup { anat: anat.clone() }).unwrap();

        assert_eq!(prep.anat_path, anat);
        assert_eq!(prep.outcome.output_path, anat);
        assert!(prep.outcome.advisory.is_none());
        assert_eq!(prep.commands.len(), 2);
        assert_eq!(prep.commands[0].engine, ContainerEngine::Docker);
        assert_eq!(prep.commands[0].anat.file, "sub-01_T1w.nii.gz");
        assert!(!out.exists());
    }

    #[test]
    fn test_prepare_resamples() {
        let temp_dir = TempDir::new().unwrap();
        let anat = temp_dir.path().join("sub-01_T1w.nii.gz");
        write_volume(&anat, [0.25, 0.25, 1.0]);
        let out = temp_dir.path().join("out");

        let config = RunConfig::new(temp_dir.path(), &out, "01")
            .with_seg_only(true)
            .with_engine(ContainerEngine::Docker);
        let prep = prepare(&config, &FixedLookup { anat }).unwrap();

        assert!(prep.outcome.was_resampled());
        assert_eq!(prep.commands[0].anat.dir, out.join("sourcedata"));
        assert_eq!(prep.commands[0].anat.file, "sub-01_T1w_resampled.nii.gz");
    }

    #[test]
    fn test_prepare_unknown_participant() {
        let config = RunConfig::new("/bids", "/out", "07").with_seg_only(true);
        let lookup = FixedLookup {
            anat: PathBuf::from("/unused"),
        };
        let err = prepare(&config, &lookup).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid participant label 07. Detected subjects: [\"01\", \"02\"]"
        );
    }

    #[test]
    fn test_prepare_missing_anat() {
        let config = RunConfig::new("/bids", "/out", "02").with_seg_only(true);
        let lookup = FixedLookup {
            anat: PathBuf::from("/unused"),
        };
        assert!(matches!(
            prepare(&config, &lookup),
            Err(PrepError::NotFound(_))
        ));
    }

    #[test]
    fn test_prepare_load_failure_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let config = RunConfig::new("/bids", temp_dir.path(), "01").with_seg_only(true);
        let lookup = FixedLookup {
            anat: temp_dir.path().join("missing_T1w.nii.gz"),
        };
        assert!(prepare(&config, &lookup).is_err());
    }
}
