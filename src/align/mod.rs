//! # Spectral alignment
//!
//! FFT cross-correlation alignment of every pixel spectrum of an MSI dataset
//! against a shared reference.
//!
//! Each worker thread owns an [`AlignmentEstimator`]. Estimators measure the
//! lag of a spectrum over one segment of the mass axis (two in bilinear
//! mode), refine it over several passes on the resampled spectrum, and
//! discard estimates beyond the configured maximum shift. The
//! [`AlignmentOrchestrator`] runs the estimators through the
//! [`ProcessingScheduler`](crate::scheduler::ProcessingScheduler) and
//! collects a [`LagReport`] in global pixel order.

use std::path::Path;

use crate::cube::{CubeSource, RawFileSource};
use crate::dataset::{DatasetDescriptor, SampleEncoding};

mod config;
mod error;
mod estimator;
mod lags;
mod orchestrator;
mod reference;
mod report;
mod resample;


pub use config::AlignmentConfig;
pub use error::AlignmentError;
pub use estimator::{AlignmentEstimator, AlignmentTrace};
pub use lags::LagPair;
pub use orchestrator::AlignmentOrchestrator;
pub use reference::ReferenceSpectrum;
pub use report::{LagReport, LagReportDocument, LagTable, PartialLagReport};

/// Align every pixel of a multi-file raw dataset.
///
/// `file_names` are resolved against `data_dir`; file `i` holds
/// `num_rows[i]` spectra of `mass.len()` samples encoded as `data_type`
/// (`"short"`, `"integer"`, `"float"` or `"double"`). The returned report
/// holds one lag pair per pixel, in file order then row order.
pub fn full_image_align<P: AsRef<Path>>(
    data_dir: P,
    file_names: &[String],
    mass: Vec<f64>,
    ref_spectrum: Vec<f64>,
    num_rows: &[usize],
    data_type: &str,
    config: &AlignmentConfig,
) -> Result<LagReport, AlignmentError> {
    config.validate()?;
    let reference = ReferenceSpectrum::new(mass, ref_spectrum)?;
    let encoding: SampleEncoding = data_type.parse()?;
    let descriptor = DatasetDescriptor::new(
        data_dir.as_ref(),
        file_names.to_vec(),
        num_rows.to_vec(),
        reference.len(),
        encoding,
    )?;

    let source = if config.correct_spectra {
        RawFileSource::open_writable(descriptor.clone())
    } else {
        RawFileSource::open(descriptor.clone())
    };
    source.verify()?;
    align_dataset(&descriptor, source, reference, config)
}

/// Align every pixel of `source`, described by `descriptor`
pub fn align_dataset<S: CubeSource>(
    descriptor: &DatasetDescriptor,
    mut source: S,
    reference: ReferenceSpectrum,
    config: &AlignmentConfig,
) -> Result<LagReport, AlignmentError> {
    AlignmentOrchestrator::new(config.clone(), descriptor, reference)?.run(&mut source)
}
