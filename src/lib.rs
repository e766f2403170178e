//! # msialign - streaming mass-axis alignment for MSI datasets
//!
//! `msialign` aligns every pixel spectrum of a mass spectrometry imaging
//! dataset against a shared reference spectrum. Datasets span several raw
//! files and are usually far larger than memory, so spectra are streamed in
//! bounded-size cubes through a fixed pool of worker threads running in
//! lock-step rounds.
//!
//! ## Key Features
//!
//! - **Bounded memory**: at most one cube per worker thread is alive at any
//!   time, whatever the dataset size.
//!
//! - **FFT cross-correlation**: sub-channel lag estimation with frequency
//!   domain oversampling and parabolic peak refinement, iterated on the
//!   resampled spectrum.
//!
//! - **Bilinear mode**: independent low and high mass segment lags joined
//!   into a piecewise-linear correction.
//!
//! - **Race-free results**: every pixel owns one cell of a preallocated lag
//!   table addressed by its global pixel index, so workers store without
//!   locking; the non-reentrant transform engine sits behind one shared guard.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use msialign::align::{full_image_align, AlignmentConfig};
//!
//! let files = vec!["run01.raw".to_string(), "run02.raw".to_string()];
//! let mass: Vec<f64> = (0..4096).map(|i| 400.0 + 0.02 * i as f64).collect();
//! let reference = vec![0.0; 4096];
//!
//! let config = AlignmentConfig::default().with_threads(8).with_bilinear(true);
//! let report = full_image_align(
//!     "/data/msi",
//!     &files,
//!     mass,
//!     reference,
//!     &[12_000, 9_500],
//!     "float",
//!     &config,
//! )?;
//!
//! let mut out = std::fs::File::create("lags.tsv")?;
//! report.write_tsv(&mut out)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`dataset`]: dataset description, sample encodings and global pixel indexing
//! - [`cube`]: cube enumeration and the [`cube::CubeSource`] loaders
//! - [`transform`]: the shared, serialized Fourier transform engine
//! - [`scheduler`]: the round-synchronized worker pool
//! - [`align`]: lag estimation, orchestration and reporting
//! - [`synthetic`]: deterministic synthetic spectra for demos and tests
//!
//! ## Lag Convention
//!
//! Lags are expressed in mass channels. A positive lag means the spectrum's
//! content sits at higher channels than the reference; correcting it samples
//! the spectrum at `channel + lag`.

#![deny(rustdoc::missing_crate_level_docs)]
// Allow some patterns common in scientific code
#![allow(clippy::too_many_arguments)]

pub mod align;
pub mod cube;
pub mod dataset;
pub mod scheduler;
pub mod synthetic;
pub mod transform;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::align::{
        align_dataset, full_image_align, AlignmentConfig, AlignmentError, AlignmentEstimator,
        AlignmentOrchestrator, LagPair, LagReport, PartialLagReport, ReferenceSpectrum,
    };
    pub use crate::cube::{CubePlan, CubeSource, InMemorySource, RawFileSource};
    pub use crate::dataset::{DatasetDescriptor, SampleEncoding};
    pub use crate::scheduler::{ProcessingScheduler, RowProcessor, SchedulerStats};
    pub use crate::transform::SharedTransformGuard;
}

/// Version of the msialign library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
