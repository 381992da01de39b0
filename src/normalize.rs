//! Minimum-resolution normalization
//!
//! FastSurfer refuses inputs finer than its supported voxel size. Volumes with
//! any axis below the floor are resampled onto a coarser grid along those axes
//! only and written next to the derivatives as `sourcedata`. Volumes that
//! already meet the floor are passed through by path.

use crate::error::{PrepError, Result};
use crate::geometry::Affine;
use crate::resample::{covering_shape, resample};
use crate::types::Resolution;
use crate::utils::{file_name_str, make_parent_dir};
use crate::volume::Volume;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Quality warning attached to every resampled output
pub const RESAMPLING_ADVISORY: &str =
    "Images are being resampled to decrease resolution. This will deteriorate the quality of your images!";

/// Derivatives subdirectory receiving resampled inputs
pub const SOURCEDATA_DIR: &str = "sourcedata";

/// Result of [`ensure_min_resolution`]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    /// Path to feed to the pipeline: the input itself or the resampled copy
    pub output_path: PathBuf,
    /// Set when the volume was resampled; callers decide how to surface it
    pub advisory: Option<String>,
}

impl NormalizeOutcome {
    pub fn was_resampled(&self) -> bool {
        self.advisory.is_some()
    }
}

/// Grid change bringing a volume up to a resolution floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionPlan {
    /// Spacing measured on the input
    pub spacing: Resolution,
    /// Spacing after resampling, never finer than `spacing`
    pub new_spacing: Resolution,
    /// `new_spacing / spacing` per axis, each >= 1
    pub scale: [f64; 3],
}

impl ResolutionPlan {
    /// Affine of the coarsened grid; the translation is kept
    pub fn target_affine(&self, affine: &Affine) -> Affine {
        affine.scale_axes(self.scale)
    }
}

/// Decide whether `affine` needs coarsening to meet `floor`.
///
/// Returns `None` when every axis is at or above the floor.
pub fn plan_resolution(affine: &Affine, floor: &Resolution) -> Result<Option<ResolutionPlan>> {
    if !floor.is_valid() {
        return Err(PrepError::InvalidGeometry(format!(
            "resolution floor must be positive, got {}",
            floor
        )));
    }

    let spacing = affine.voxel_spacing();
    if !spacing.is_valid() {
        return Err(PrepError::InvalidGeometry(format!(
            "voxel spacing must be positive, got {}",
            spacing
        )));
    }

    if !spacing.is_finer_than(floor) {
        return Ok(None);
    }

    let new_spacing = spacing.coarsened_to(floor);
    let mut scale = [1.0; 3];
    for (axis, s) in scale.iter_mut().enumerate() {
        *s = new_spacing.get(axis) / spacing.get(axis);
    }

    Ok(Some(ResolutionPlan {
        spacing,
        new_spacing,
        scale,
    }))
}

/// Resample `volume` according to `plan`, keeping its header
pub fn coarsen(volume: &Volume, plan: &ResolutionPlan) -> Result<Volume> {
    let target_affine = plan.target_affine(volume.affine());
    let shape = covering_shape(volume.shape(), volume.affine(), &target_affine)?;
    debug!(
        "Resampling {:?} -> {:?} (scale {:?})",
        volume.shape(),
        shape,
        plan.scale
    );
    let data = resample(volume.data(), volume.affine(), &target_affine, shape)?;
    Ok(volume.with_grid(data, target_affine))
}

/// Name of the resampled copy: the first `.nii` becomes `_resampled.nii`
pub fn resampled_file_name(basename: &str) -> Result<String> {
    if !basename.contains(".nii") {
        return Err(PrepError::InvalidPath(format!(
            "{} is not a NIfTI file name",
            basename
        )));
    }
    Ok(basename.replacen(".nii", "_resampled.nii", 1))
}

/// `<derivatives_dir>/sourcedata/<resampled name>`
pub fn resampled_output_path(image_path: &Path, derivatives_dir: &Path) -> Result<PathBuf> {
    let name = resampled_file_name(file_name_str(image_path)?)?;
    Ok(derivatives_dir.join(SOURCEDATA_DIR).join(name))
}

/// Make sure no axis of the image at `image_path` is finer than
/// `target_resolution`.
///
/// When every axis meets the floor the input path is returned and nothing is
/// written. Otherwise the too-fine axes are coarsened to the floor, the result
/// is written under `derivatives_dir/sourcedata/` with the original header,
/// and the outcome carries [`RESAMPLING_ADVISORY`].
pub fn ensure_min_resolution(
    image_path: &Path,
    derivatives_dir: &Path,
    target_resolution: Resolution,
) -> Result<NormalizeOutcome> {
    let volume = Volume::load(image_path)?;

    let plan = match plan_resolution(volume.affine(), &target_resolution)? {
        Some(plan) => plan,
        None => {
            debug!(
                "{} meets the {} floor",
                image_path.display(),
                target_resolution
            );
            return Ok(NormalizeOutcome {
                output_path: image_path.to_path_buf(),
                advisory: None,
            });
        }
    };

    let output_path = resampled_output_path(image_path, derivatives_dir)?;
    let resampled = coarsen(&volume, &plan)?;

    make_parent_dir(&output_path)?;
    resampled.save(&output_path)?;
    info!(
        "Image resampled from {} to {} and saved to {}",
        plan.spacing,
        plan.new_spacing,
        output_path.display()
    );

    Ok(NormalizeOutcome {
        output_path,
        advisory: Some(RESAMPLING_ADVISORY.to_string()),
    })
}

/// [`ensure_min_resolution`] with the default 0.5 mm isotropic floor
pub fn ensure_min_resolution_default(
    image_path: &Path,
    derivatives_dir: &Path,
) -> Result<NormalizeOutcome> {
    ensure_min_resolution(image_path, derivatives_dir, Resolution::DEFAULT_FLOOR)
}
