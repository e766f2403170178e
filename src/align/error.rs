use crate::cube::CubeError;
use crate::dataset::DatasetError;
use crate::scheduler::ProcessingError;
use crate::transform::TransformError;

use super::report::PartialLagReport;

/// Errors that can occur while configuring or running an alignment
#[derive(Debug, thiserror::Error)]
pub enum AlignmentError {
    /// A configuration value is out of range
    #[error("Invalid alignment configuration: {0}")]
    InvalidConfig(String),

    /// Mass axis and reference intensities differ in length
    #[error("Reference length mismatch: {mass} mass values, {intensity} intensities")]
    ReferenceLength {
        /// Mass axis length
        mass: usize,
        /// Reference intensity length
        intensity: usize,
    },

    /// The reference spectrum has no channels
    #[error("Reference spectrum is empty")]
    EmptyReference,

    /// The mass axis is not strictly increasing (or holds a non-finite value)
    #[error("Mass axis is not strictly increasing at position {0}")]
    InvalidMassAxis(usize),

    /// The reference intensities hold a NaN or infinity
    #[error("Reference intensity at position {0} is not finite")]
    NonFiniteIntensity(usize),

    /// Dataset and reference disagree on the number of mass channels
    #[error("Dataset has {dataset} mass channels but the reference has {reference}")]
    ChannelMismatch {
        /// Reference channel count
        reference: usize,
        /// Dataset channel count
        dataset: usize,
    },

    /// A spectrum handed to an estimator has the wrong length
    #[error("Spectrum has {actual} channels, expected {expected}")]
    SpectrumLength {
        /// Reference channel count
        expected: usize,
        /// Spectrum length
        actual: usize,
    },

    /// Dataset description error
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Cube access error outside of a run
    #[error("Cube error: {0}")]
    Cube(#[from] CubeError),

    /// Transform engine error
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// The result table could not be allocated
    #[error("Cannot allocate the lag table for {pixels} pixels")]
    Allocation {
        /// Requested pixel count
        pixels: usize,
    },

    /// The run failed; lags written before the failure are kept
    #[error(
        "Alignment aborted after {} of {} pixels: {source}",
        .partial.written_count(),
        .partial.len()
    )]
    Aborted {
        /// Failure raised by the scheduler
        #[source]
        source: ProcessingError,
        /// Lags written before the failure
        partial: PartialLagReport,
    },

    /// The run completed but some pixels were never written
    #[error("Alignment finished with {missing} unwritten pixels")]
    Incomplete {
        /// Number of pixels without a lag
        missing: usize,
    },
}

impl AlignmentError {
    /// Partial lags of an aborted run
    pub fn partial(&self) -> Option<&PartialLagReport> {
        match self {
            AlignmentError::Aborted { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Map a per-pixel estimator failure onto the scheduler's error type
    pub(crate) fn into_processing(self, pixel: usize) -> ProcessingError {
        match self {
            AlignmentError::Transform(err) => ProcessingError::Transform(err),
            other => ProcessingError::Row {
                pixel,
                message: other.to_string(),
            },
        }
    }
}
