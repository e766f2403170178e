//! # Synthetic MSI spectra
//!
//! Deterministic Gaussian-peak spectra on a uniform mass axis, used by the
//! `demo` command, tests and benchmarks. Shifted spectra are evaluated
//! analytically, so the true lag of every pixel is known exactly.

use crate::align::{AlignmentError, LagPair, ReferenceSpectrum};
use crate::cube::{CubeError, InMemorySource};

/// First mass of the synthetic axis
pub const MASS_START: f64 = 500.0;
/// Mass spacing between channels
pub const MASS_STEP: f64 = 0.01;

const PEAK_SIGMA: f64 = 2.0;
const PEAK_PITCH: usize = 47;
const PEAK_OFFSET: usize = 40;
const BASELINE: f64 = 5.0;
/// Peaks are kept this far from the mid channel so that no peak straddles
/// the boundary between bilinear segments
const MID_GUARD: usize = 16;

/// Shift of a synthetic spectrum along the channel axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShiftProfile {
    /// Same shift for every channel
    Constant(f64),
    /// Shift varying linearly from the first to the last channel
    Linear { start: f64, end: f64 },
}

impl ShiftProfile {
    /// Shift at `channel` of a spectrum with `channels` channels
    pub fn at(&self, channel: f64, channels: usize) -> f64 {
        match *self {
            ShiftProfile::Constant(shift) => shift,
            ShiftProfile::Linear { start, end } => {
                if channels < 2 {
                    return start;
                }
                start + (end - start) * channel / (channels - 1) as f64
            }
        }
    }

    /// Expected lags for an estimator whose segment centres are given
    pub fn expected(&self, low_center: f64, high_center: f64, channels: usize) -> LagPair {
        LagPair::new(self.at(low_center, channels), self.at(high_center, channels))
    }
}

/// Generator of Gaussian-peak spectra with `channels` channels
#[derive(Debug, Clone)]
pub struct SyntheticSpectra {
    channels: usize,
    peaks: Vec<(f64, f64)>,
}

impl SyntheticSpectra {
    pub fn new(channels: usize) -> Self {
        let mid = channels / 2;
        let peaks = (0..)
            .map(|k| (k, PEAK_OFFSET + PEAK_PITCH * k))
            .take_while(|&(_, pos)| pos + PEAK_OFFSET < channels)
            .filter(|&(_, pos)| pos.abs_diff(mid) > MID_GUARD)
            .map(|(k, pos)| (pos as f64, 1000.0 * (1 + (k * 7919) % 13) as f64))
            .collect();
        Self { channels, peaks }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Uniform mass axis starting at [`MASS_START`]
    pub fn mass_axis(&self) -> Vec<f64> {
        (0..self.channels)
            .map(|i| MASS_START + MASS_STEP * i as f64)
            .collect()
    }

    /// Unshifted spectrum
    pub fn reference_intensity(&self) -> Vec<f64> {
        self.shifted(ShiftProfile::Constant(0.0))
    }

    /// Reference spectrum over [`mass_axis`](Self::mass_axis)
    pub fn reference(&self) -> Result<ReferenceSpectrum, AlignmentError> {
        ReferenceSpectrum::new(self.mass_axis(), self.reference_intensity())
    }

    /// Spectrum whose content sits `profile` channels above the reference
    pub fn shifted(&self, profile: ShiftProfile) -> Vec<f64> {
        (0..self.channels)
            .map(|i| {
                let x = i as f64 - profile.at(i as f64, self.channels);
                self.evaluate(x)
            })
            .collect()
    }

    fn evaluate(&self, x: f64) -> f64 {
        let peaks: f64 = self
            .peaks
            .iter()
            .map(|&(center, height)| {
                let z = (x - center) / PEAK_SIGMA;
                height * (-0.5 * z * z).exp()
            })
            .sum();
        BASELINE + peaks
    }
}

/// Deterministic per-pixel shift in `[-max_shift, max_shift]`
pub fn pixel_shift(pixel: usize, max_shift: f64) -> f64 {
    max_shift * (((pixel * 37) % 11) as f64 / 5.0 - 1.0)
}

/// In-memory dataset of shifted spectra
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub spectra: SyntheticSpectra,
    /// Rows of every file
    pub files: Vec<Vec<Vec<f64>>>,
    /// True shift of every pixel in global order
    pub shifts: Vec<f64>,
}

impl SyntheticDataset {
    /// Build `rows_per_file` constant-shift spectra using [`pixel_shift`]
    pub fn generate(rows_per_file: &[usize], channels: usize, max_shift: f64) -> Self {
        let spectra = SyntheticSpectra::new(channels);
        let mut shifts = Vec::new();
        let files: Vec<Vec<Vec<f64>>> = rows_per_file
            .iter()
            .map(|&rows| {
                (0..rows)
                    .map(|_| {
                        let shift = pixel_shift(shifts.len(), max_shift);
                        shifts.push(shift);
                        spectra.shifted(ShiftProfile::Constant(shift))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self {
            spectra,
            files,
            shifts,
        }
    }

    pub fn rows_per_file(&self) -> Vec<usize> {
        self.files.iter().map(Vec::len).collect()
    }

    pub fn total_pixels(&self) -> usize {
        self.shifts.len()
    }

    /// Cube source over a copy of the rows
    pub fn source(&self) -> Result<InMemorySource, CubeError> {
        InMemorySource::from_rows(self.spectra.channels(), self.files.clone())
    }
}
