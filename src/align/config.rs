use serde::{Deserialize, Serialize};

use crate::cube::CubePlan;
use crate::dataset::DatasetDescriptor;

use super::error::AlignmentError;

/// Parameters of a full-image alignment run.
///
/// Defaults match the `full_image_align` entry point: a single segment over
/// the whole mass axis, three refinement passes, 200 ppm maximum shift and
/// two-fold oversampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Worker threads (one estimator each)
    pub threads: usize,
    /// Refinement passes per spectrum
    pub iterations: usize,
    /// Frequency-domain oversampling factor of the correlation
    pub oversampling: usize,
    /// Estimate independent low and high segment lags
    pub bilinear: bool,
    /// Start of the low segment (fraction of the channel count)
    pub ref_low: f64,
    /// Boundary between the low and high segments
    pub ref_mid: f64,
    /// End of the high segment
    pub ref_high: f64,
    /// Largest accepted shift in parts per million of mass
    pub max_shift_ppm: f64,
    /// Memory budget of a single cube in MiB
    pub cube_memory_mb: usize,
    /// Fixed cube height in rows, overriding `cube_memory_mb`
    pub cube_rows: Option<usize>,
    /// Resample every spectrum with its lags and persist it
    pub correct_spectra: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            iterations: 3,
            oversampling: 2,
            bilinear: false,
            ref_low: 0.0,
            ref_mid: 0.5,
            ref_high: 1.0,
            max_shift_ppm: 200.0,
            cube_memory_mb: 64,
            cube_rows: None,
            correct_spectra: false,
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl AlignmentConfig {
    /// Set the worker thread count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Enable or disable two-segment alignment
    pub fn with_bilinear(mut self, bilinear: bool) -> Self {
        self.bilinear = bilinear;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_max_shift_ppm(mut self, ppm: f64) -> Self {
        self.max_shift_ppm = ppm;
        self
    }

    /// Set the low/mid/high segment breakpoints
    pub fn with_breakpoints(mut self, low: f64, mid: f64, high: f64) -> Self {
        self.ref_low = low;
        self.ref_mid = mid;
        self.ref_high = high;
        self
    }

    pub fn with_cube_rows(mut self, rows: usize) -> Self {
        self.cube_rows = Some(rows);
        self
    }

    /// Cube memory budget in bytes
    pub fn cube_memory_bytes(&self) -> usize {
        self.cube_memory_mb.saturating_mul(1024 * 1024)
    }

    /// Check every parameter before any work is scheduled
    pub fn validate(&self) -> Result<(), AlignmentError> {
        let invalid = |msg: String| Err(AlignmentError::InvalidConfig(msg));

        if self.threads == 0 {
            return invalid("thread count must be at least 1".into());
        }
        if self.iterations == 0 {
            return invalid("iterations must be at least 1".into());
        }
        if self.oversampling == 0 {
            return invalid("oversampling must be at least 1".into());
        }
        let ordered = 0.0 <= self.ref_low
            && self.ref_low < self.ref_mid
            && self.ref_mid < self.ref_high
            && self.ref_high <= 1.0;
        if !ordered {
            return invalid(format!(
                "breakpoints must satisfy 0 <= low < mid < high <= 1 (got {}, {}, {})",
                self.ref_low, self.ref_mid, self.ref_high
            ));
        }
        if self.cube_rows == Some(0) {
            return invalid("cube rows must be at least 1".into());
        }
        if !self.max_shift_ppm.is_finite() || self.max_shift_ppm < 0.0 {
            return invalid(format!(
                "max shift must be a non-negative number of ppm (got {})",
                self.max_shift_ppm
            ));
        }
        Ok(())
    }

    /// Cube plan for `descriptor` under this configuration
    pub fn cube_plan(&self, descriptor: &DatasetDescriptor) -> CubePlan {
        match self.cube_rows {
            Some(rows) => CubePlan::new(descriptor.rows_per_file(), rows),
            None => CubePlan::for_descriptor(descriptor, self.cube_memory_bytes()),
        }
    }
}
