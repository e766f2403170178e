//! Integration tests for msialign
//!
//! These tests write raw multi-file datasets to disk and run the full
//! alignment pipeline over them.

use byteorder::{LittleEndian, WriteBytesExt};
use msialign::align::{full_image_align, AlignmentConfig, AlignmentError};
use msialign::cube::{CubeSource, RawFileSource};
use msialign::dataset::{DatasetDescriptor, SampleEncoding};
use msialign::scheduler::ProcessingError;
use msialign::synthetic::SyntheticDataset;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::tempdir;

const CHANNELS: usize = 1024;

/// Write rows as little-endian f32 samples
fn write_f32_file(path: &Path, rows: &[Vec<f64>]) {
    let mut writer = BufWriter::new(File::create(path).unwrap());
    for row in rows {
        for &value in row {
            writer.write_f32::<LittleEndian>(value as f32).unwrap();
        }
    }
    writer.flush().unwrap();
}

/// Write a synthetic dataset; returns the file names
fn write_dataset(dir: &Path, data: &SyntheticDataset) -> Vec<String> {
    data.files
        .iter()
        .enumerate()
        .map(|(i, rows)| {
            let name = format!("pixels_{i}.raw");
            write_f32_file(&dir.join(&name), rows);
            name
        })
        .collect()
}

/// Align a synthetic multi-file dataset from disk
#[test]
fn test_full_image_align_from_raw_files() {
    let dir = tempdir().unwrap();
    let data = SyntheticDataset::generate(&[12, 0, 9, 5], CHANNELS, 2.0);
    let names = write_dataset(dir.path(), &data);

    let config = AlignmentConfig::default().with_threads(3).with_cube_rows(4);
    let report = full_image_align(
        dir.path(),
        &names,
        data.spectra.mass_axis(),
        data.spectra.reference_intensity(),
        &data.rows_per_file(),
        "float",
        &config,
    )
    .unwrap();

    // One entry per pixel in global order
    assert_eq!(report.len(), 26);
    assert_eq!(report.lag_high.len(), 26);
    for (pixel, (lags, &shift)) in report.iter().zip(&data.shifts).enumerate() {
        assert!(
            (lags.low - shift).abs() < 0.1,
            "pixel {pixel}: {lags:?} vs {shift}"
        );
        assert_eq!(lags.low, lags.high);
    }
}

/// Same data, one thread and many threads, identical report
#[test]
fn test_thread_count_invariance_on_disk() {
    let dir = tempdir().unwrap();
    let data = SyntheticDataset::generate(&[10, 7], CHANNELS, 1.5);
    let names = write_dataset(dir.path(), &data);

    let run = |threads: usize| {
        let config = AlignmentConfig::default()
            .with_threads(threads)
            .with_cube_rows(3);
        full_image_align(
            dir.path(),
            &names,
            data.spectra.mass_axis(),
            data.spectra.reference_intensity(),
            &data.rows_per_file(),
            "float",
            &config,
        )
        .unwrap()
    };

    assert_eq!(run(1), run(8));
}

/// Corrected spectra are written back into the raw files
#[test]
fn test_correct_spectra_rewrites_files() {
    let dir = tempdir().unwrap();
    let data = SyntheticDataset::generate(&[4], CHANNELS, 2.0);
    let names = write_dataset(dir.path(), &data);

    let config = AlignmentConfig {
        correct_spectra: true,
        ..AlignmentConfig::default().with_threads(2).with_cube_rows(1)
    };
    full_image_align(
        dir.path(),
        &names,
        data.spectra.mass_axis(),
        data.spectra.reference_intensity(),
        &[4],
        "float",
        &config,
    )
    .unwrap();

    let descriptor = DatasetDescriptor::new(
        dir.path(),
        names,
        vec![4],
        CHANNELS,
        SampleEncoding::Float32,
    )
    .unwrap();
    let mut source = RawFileSource::open(descriptor.clone());
    let plan = config.cube_plan(&descriptor);
    let reference = data.spectra.reference_intensity();
    for span in plan.spans() {
        let cube = source.load_cube(span).unwrap();
        for (pixel, row) in cube.rows() {
            let worst = row[50..CHANNELS - 50]
                .iter()
                .zip(&reference[50..CHANNELS - 50])
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            assert!(worst < 1000.0, "pixel {pixel}: {worst}");
        }
    }
}

/// Two single-row files whose spectra equal the reference
#[test]
fn test_identical_single_rows() {
    let dir = tempdir().unwrap();
    let mass = vec![250.0, 250.01, 250.02];
    let reference = vec![3.0, 9.0, 4.0];
    for name in ["a.raw", "b.raw"] {
        let mut file = File::create(dir.path().join(name)).unwrap();
        for &value in &reference {
            file.write_f64::<LittleEndian>(value).unwrap();
        }
    }

    let names = vec!["a.raw".to_string(), "b.raw".to_string()];
    let report = full_image_align(
        dir.path(),
        &names,
        mass,
        reference,
        &[1, 1],
        "double",
        &AlignmentConfig::default().with_threads(1),
    )
    .unwrap();

    assert_eq!(report.len(), 2);
    for lags in report.iter() {
        assert!(lags.max_abs() < 1e-6);
    }
}

/// Configuration errors surface before any file is opened
#[test]
fn test_configuration_errors() {
    let dir = tempdir().unwrap();
    let names = vec!["missing.raw".to_string()];
    let mass = vec![100.0, 101.0, 102.0];
    let reference = vec![0.0, 1.0, 0.0];

    let bad_breakpoints = AlignmentConfig::default().with_breakpoints(0.0, 0.9, 0.5);
    let result = full_image_align(
        dir.path(),
        &names,
        mass.clone(),
        reference.clone(),
        &[1],
        "float",
        &bad_breakpoints,
    );
    assert!(matches!(result, Err(AlignmentError::InvalidConfig(_))));

    let result = full_image_align(
        dir.path(),
        &names,
        mass.clone(),
        vec![0.0; 2],
        &[1],
        "float",
        &AlignmentConfig::default(),
    );
    assert!(matches!(result, Err(AlignmentError::ReferenceLength { .. })));

    let result = full_image_align(
        dir.path(),
        &names,
        mass.clone(),
        reference.clone(),
        &[1, 2],
        "float",
        &AlignmentConfig::default(),
    );
    assert!(matches!(result, Err(AlignmentError::Dataset(_))));

    let result = full_image_align(
        dir.path(),
        &names,
        mass,
        reference,
        &[1],
        "complex",
        &AlignmentConfig::default(),
    );
    assert!(matches!(result, Err(AlignmentError::Dataset(_))));
}

/// A file shorter than its declared row count is rejected up front
#[test]
fn test_truncated_file_detected() {
    let dir = tempdir().unwrap();
    let data = SyntheticDataset::generate(&[3], CHANNELS, 1.0);
    let names = write_dataset(dir.path(), &data);

    let result = full_image_align(
        dir.path(),
        &names,
        data.spectra.mass_axis(),
        data.spectra.reference_intensity(),
        &[5],
        "float",
        &AlignmentConfig::default().with_threads(2),
    );
    assert!(matches!(result, Err(AlignmentError::Cube(_))));
}

/// A file removed after validation aborts the run with partial lags
#[test]
fn test_missing_file_during_run_keeps_partial_lags() {
    let dir = tempdir().unwrap();
    let data = SyntheticDataset::generate(&[4, 4], CHANNELS, 1.0);
    let names = write_dataset(dir.path(), &data);

    let descriptor = DatasetDescriptor::new(
        dir.path(),
        names.clone(),
        data.rows_per_file(),
        CHANNELS,
        SampleEncoding::Float32,
    )
    .unwrap();
    std::fs::remove_file(dir.path().join(&names[1])).unwrap();

    let config = AlignmentConfig::default().with_threads(2).with_cube_rows(2);
    let err = msialign::align::align_dataset(
        &descriptor,
        RawFileSource::open(descriptor.clone()),
        data.spectra.reference().unwrap(),
        &config,
    )
    .unwrap_err();

    match &err {
        AlignmentError::Aborted { source, partial } => {
            assert!(matches!(source, ProcessingError::Cube(_)));
            assert_eq!(partial.len(), 8);
            assert_eq!(partial.written_count(), 4);
            assert!((0..4).all(|pixel| partial.get(pixel).is_some()));
            assert!((4..8).all(|pixel| partial.get(pixel).is_none()));
        }
        other => panic!("unexpected error: {other}"),
    }
}
