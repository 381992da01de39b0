//! End-to-end runs of the `bids_fastsurfer` binary on a scratch dataset

use bids_fastsurfer::{Affine, Volume};
use ndarray::Array3;
use nifti::NiftiHeader;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Minimal raw dataset with one subject and a T1w at `spacing`
fn create_dataset(root: &Path, spacing: [f64; 3]) {
    fs::create_dir_all(root.join("sub-01").join("anat")).unwrap();
    fs::write(
        root.join("dataset_description.json"),
        r#"{"Name": "test", "BIDSVersion": "1.6.0"}"#,
    )
    .unwrap();

    let volume = Volume::new(
        NiftiHeader::default(),
        Affine::axis_aligned(spacing, [0.0; 3]),
        Array3::from_elem((6, 6, 6), 50.0),
    );
    volume
        .save(root.join("sub-01").join("anat").join("sub-01_T1w.nii.gz"))
        .unwrap();
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bids_fastsurfer"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to launch binary")
}

#[test]
fn test_docker_seg_only_command() {
    let temp_dir = TempDir::new().unwrap();
    let bids = temp_dir.path().join("bids");
    let out = temp_dir.path().join("out");
    create_dataset(&bids, [1.0, 1.0, 1.0]);

    let output = run(&[
        bids.to_str().unwrap(),
        out.to_str().unwrap(),
        "participant",
        "--participant_label",
        "01",
        "--docker",
        "--seg_only",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("======================== Docker Command ========================")
    );
    let command = lines.next().unwrap();
    assert!(command.starts_with("sudo docker run --gpus all -v "));
    assert!(command.contains("--t1 /data/sub-01_T1w.nii.gz"));
    assert!(command.ends_with("--sid sub-01 --seg_only --3T --threads 2"));

    assert!(out.join("dataset_description.json").is_file());
    assert!(!out.join("sourcedata").exists());
}

#[test]
fn test_fine_input_is_resampled() {
    let temp_dir = TempDir::new().unwrap();
    let bids = temp_dir.path().join("bids");
    let out = temp_dir.path().join("out");
    create_dataset(&bids, [0.25, 0.25, 0.25]);

    let output = run(&[
        bids.to_str().unwrap(),
        out.to_str().unwrap(),
        "--participant_label",
        "sub-01",
        "--singularity",
        "--seg_only",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("===================== Singularity Command ======================"));
    assert!(stdout.contains("--t1 /data/sub-01_T1w_resampled.nii.gz"));
    assert!(out.join("sourcedata").join("sub-01_T1w_resampled.nii.gz").is_file());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Images are being resampled to decrease resolution"));
}

#[test]
fn test_unknown_participant_fails() {
    let temp_dir = TempDir::new().unwrap();
    let bids = temp_dir.path().join("bids");
    create_dataset(&bids, [1.0, 1.0, 1.0]);

    let output = run(&[
        bids.to_str().unwrap(),
        temp_dir.path().join("out").to_str().unwrap(),
        "--participant_label",
        "02",
        "--docker",
        "--seg_only",
    ]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid participant label 02"));
}

#[test]
fn test_missing_license_fails() {
    let temp_dir = TempDir::new().unwrap();
    let bids = temp_dir.path().join("bids");
    create_dataset(&bids, [1.0, 1.0, 1.0]);

    let output = run(&[
        bids.to_str().unwrap(),
        temp_dir.path().join("out").to_str().unwrap(),
        "--participant_label",
        "01",
        "--docker",
    ]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
