//! bids_fastsurfer - prepare a BIDS subject for FastSurfer
//!
//! Finds a participant's T1-weighted volume in a BIDS dataset, makes sure no
//! voxel axis is finer than FastSurfer supports, and builds the Docker or
//! Singularity command that runs FastSurfer on it. Nothing is executed; the
//! commands are returned for the caller to print or run.
//!
//! # Features
//!
//! - NIfTI-1 loading and writing (`.nii`, `.nii.gz`) with header preservation
//! - Voxel spacing from the sform/qform affine, independent of orientation
//! - Trilinear resampling onto a coarser grid along too-fine axes only
//! - Minimal BIDS indexing: subjects and entity-encoded file names
//!
//! # Example
//!
//! ```rust,ignore
//! use bids_fastsurfer::{ensure_min_resolution, Resolution};
//! use std::path::Path;
//!
//! let outcome = ensure_min_resolution(
//!     Path::new("/data/bids/sub-01/anat/sub-01_T1w.nii.gz"),
//!     Path::new("/data/derivatives/fastsurfer"),
//!     Resolution::isotropic(0.5),
//! )?;
//! if let Some(advisory) = &outcome.advisory {
//!     eprintln!("{}", advisory);
//! }
//! println!("{}", outcome.output_path.display());
//! ```

pub mod bids;
pub mod command;
pub mod config;
pub mod error;
pub mod geometry;
pub mod metadata;
pub mod normalize;
pub mod pipeline;
pub mod resample;
pub mod types;
pub mod utils;
pub mod volume;

// Re-exports
pub use bids::{BidsFile, BidsLayout, SubjectLookup};
pub use command::ContainerCommand;
pub use config::RunConfig;
pub use error::{PrepError, Result};
pub use geometry::Affine;
pub use metadata::{write_dataset_description, DatasetDescription};
pub use normalize::{ensure_min_resolution, ensure_min_resolution_default, NormalizeOutcome};
pub use pipeline::{prepare, Preparation};
pub use types::{AnalysisLevel, ContainerEngine, Resolution};
pub use volume::Volume;

/// Version of this tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
