//! # bids_fastsurfer entry point
//!
//! Indexes the dataset, prepares the participant and prints the container
//! commands. Diagnostics go to stderr; stdout only carries the commands.

use anyhow::Context;
use bids_fastsurfer::types::{AnalysisLevel, ContainerEngine, Resolution};
use bids_fastsurfer::{prepare, write_dataset_description, BidsLayout, RunConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// bids_fastsurfer: tool to run fastsurfer on a BIDS dataset.
///
/// Prints the Docker and/or Singularity command running FastSurfer on one
/// participant's T1w image, resampled first if it is finer than FastSurfer
/// accepts.
#[derive(Parser, Debug)]
#[command(name = "bids_fastsurfer", version, about)]
struct Cli {
    /// BIDS root directory containing the dataset.
    bids_dir: PathBuf,

    /// Directory for the outputs.
    derivatives_dir: PathBuf,

    /// Analysis level: either 'participant' or 'group'.
    #[arg(value_enum)]
    analysis_level: Option<AnalysisLevel>,

    /// Subject to process (e.g. 01)
    #[arg(long = "participant_label")]
    participant_label: String,

    /// Path to the FreeSurfer license
    #[arg(long = "fs_license")]
    fs_license: Option<PathBuf>,

    /// Output the docker command
    #[arg(long)]
    docker: bool,

    /// Output the singularity command
    #[arg(long)]
    singularity: bool,

    /// Only perform segmentation (no surface is reconstructed)
    #[arg(long = "seg_only")]
    seg_only: bool,

    /// Docker image to run
    #[arg(long, default_value = bids_fastsurfer::command::DEFAULT_IMAGE)]
    image: String,

    /// Singularity image file
    #[arg(long, default_value = bids_fastsurfer::command::DEFAULT_SIF)]
    sif: PathBuf,

    /// Threads given to FastSurfer
    #[arg(long, default_value_t = bids_fastsurfer::command::DEFAULT_THREADS)]
    threads: usize,

    /// Smallest voxel size in mm (isotropic) handed to FastSurfer
    #[arg(long = "min-resolution", default_value_t = 0.5)]
    min_resolution: f64,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        let mut config = RunConfig::new(self.bids_dir, self.derivatives_dir, self.participant_label)
            .with_seg_only(self.seg_only)
            .with_image(self.image)
            .with_sif(self.sif)
            .with_threads(self.threads)
            .with_min_resolution(Resolution::isotropic(self.min_resolution));

        if let Some(level) = self.analysis_level {
            config = config.with_analysis_level(level);
        }
        if let Some(license) = self.fs_license {
            config = config.with_fs_license(license);
        }
        if self.docker {
            config = config.with_engine(ContainerEngine::Docker);
        }
        if self.singularity {
            config = config.with_engine(ContainerEngine::Singularity);
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().into_config().with_absolute_paths()?;
    config.validate()?;

    info!("Indexing BIDS dataset...");
    let layout = BidsLayout::index(&config.bids_dir)
        .with_context(|| format!("failed to index {}", config.bids_dir.display()))?;
    write_dataset_description(&config.derivatives_dir).with_context(|| {
        format!(
            "failed to write dataset description in {}",
            config.derivatives_dir.display()
        )
    })?;

    let preparation = prepare(&config, &layout)?;
    if let Some(advisory) = &preparation.outcome.advisory {
        warn!("{}", advisory);
    }

    if preparation.commands.is_empty() {
        warn!("No container engine selected, pass --docker and/or --singularity");
    }

    for command in &preparation.commands {
        if command.engine == ContainerEngine::Singularity && !command.sif.is_file() {
            warn!("Make sure to adapt the path to the singularity image");
        }
        println!("{}", command.engine.banner());
        println!("{}", command);
    }

    Ok(())
}
