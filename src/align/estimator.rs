use std::sync::Arc;

use log::debug;
use rustfft::num_complex::Complex;

use crate::transform::{SharedTransformGuard, TransformDirection, TransformError, TransformPlan};

use super::config::AlignmentConfig;
use super::error::AlignmentError;
use super::lags::LagPair;
use super::reference::ReferenceSpectrum;
use super::resample::{resample, LagModel};

/// Residual (in channels) below which refinement stops
const CONVERGED: f64 = 1e-4;

/// Outcome of one segment pass
enum Estimate {
    Lag(f64),
    /// Correlation peak beyond the shift bound
    OutOfBound,
    /// Non-finite samples or correlation
    Degenerate,
}

/// One correlation window of the mass axis with its transform state
struct Segment {
    start: usize,
    end: usize,
    /// Centre channel
    center: f64,
    /// Largest accepted lag in channels
    max_lag: f64,
    oversampling: usize,
    forward: TransformPlan,
    inverse: TransformPlan,
    /// Spectrum of the mean-removed reference segment
    reference: Vec<Complex<f64>>,
    buffer: Vec<Complex<f64>>,
    correlation: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl Segment {
    fn new(
        start: usize,
        end: usize,
        reference: &ReferenceSpectrum,
        config: &AlignmentConfig,
        guard: &SharedTransformGuard,
    ) -> Result<Self, TransformError> {
        let len = end - start;
        let padded = (2 * len).next_power_of_two().max(2);
        let upsampled = padded * config.oversampling;

        let forward = guard.plan(padded, TransformDirection::Forward)?;
        let inverse = guard.plan(upsampled, TransformDirection::Inverse)?;
        let scratch_len = forward.scratch_len().max(inverse.scratch_len());

        let center = (start + end - 1) as f64 / 2.0;
        let center_channel = (start + end - 1) / 2;
        let spacing = reference.spacing_at(center_channel);
        let max_lag = if spacing > 0.0 {
            config.max_shift_ppm * 1e-6 * reference.mass()[center_channel] / spacing
        } else {
            0.0
        };

        let mut segment = Self {
            start,
            end,
            center,
            max_lag,
            oversampling: config.oversampling,
            forward,
            inverse,
            reference: Vec::new(),
            buffer: vec![Complex::default(); padded],
            correlation: vec![Complex::default(); upsampled],
            scratch: vec![Complex::default(); scratch_len],
        };

        if segment.load(&reference.intensity()[start..end]) {
            guard.execute(&segment.forward, &mut segment.buffer, &mut segment.scratch)?;
        }
        segment.reference = segment.buffer.clone();
        Ok(segment)
    }

    /// Fill the transform buffer with the mean-removed `values`.
    ///
    /// Returns false for a flat segment, which carries no shift information.
    fn load(&mut self, values: &[f64]) -> bool {
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let tolerance = f64::EPSILON * mean.abs().max(1.0);
        let informative = values.iter().any(|v| (v - mean).abs() > tolerance);

        self.buffer.fill(Complex::default());
        if informative {
            for (dst, &v) in self.buffer.iter_mut().zip(values) {
                *dst = Complex::new(v - mean, 0.0);
            }
        }
        informative
    }

    /// Lag of `spectrum` against the reference over this segment
    fn estimate(
        &mut self,
        spectrum: &[f64],
        guard: &SharedTransformGuard,
    ) -> Result<Estimate, TransformError> {
        let values = &spectrum[self.start..self.end];
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            debug!(
                "Non-finite sample at channel {} in channels {}..{}",
                self.start + pos,
                self.start,
                self.end
            );
            return Ok(Estimate::Degenerate);
        }
        if !self.load(values) {
            return Ok(Estimate::Lag(0.0));
        }
        guard.execute(&self.forward, &mut self.buffer, &mut self.scratch)?;

        // Cross-power spectrum, zero-padded in frequency so the inverse
        // transform yields the correlation at 1/oversampling channel steps.
        let n = self.buffer.len();
        let m = self.correlation.len();
        let half = n / 2;
        self.correlation.fill(Complex::default());
        for k in 0..half {
            self.correlation[k] = self.buffer[k] * self.reference[k].conj();
        }
        let nyquist = self.buffer[half] * self.reference[half].conj() * 0.5;
        self.correlation[half] += nyquist;
        self.correlation[m - half] += nyquist;
        for k in half + 1..n {
            self.correlation[m - n + k] = self.buffer[k] * self.reference[k].conj();
        }

        guard.execute(&self.inverse, &mut self.correlation, &mut self.scratch)?;

        let (peak, _) = self
            .correlation
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, c)| {
                if c.re > best.1 {
                    (i, c.re)
                } else {
                    best
                }
            });

        let y0 = self.correlation[(peak + m - 1) % m].re;
        let y1 = self.correlation[peak].re;
        let y2 = self.correlation[(peak + 1) % m].re;
        let curvature = y0 - 2.0 * y1 + y2;
        let delta = if curvature < 0.0 {
            (0.5 * (y0 - y2) / curvature).clamp(-0.5, 0.5)
        } else {
            0.0
        };

        let offset = if peak > m / 2 {
            peak as f64 - m as f64
        } else {
            peak as f64
        };
        let lag = (offset + delta) / self.oversampling as f64;

        if !lag.is_finite() {
            debug!("Non-finite correlation in channels {}..{}", self.start, self.end);
            return Ok(Estimate::Degenerate);
        }
        if lag.abs() > self.max_lag {
            debug!(
                "Lag {:.3} exceeds bound {:.3} in channels {}..{}",
                lag, self.max_lag, self.start, self.end
            );
            return Ok(Estimate::OutOfBound);
        }
        Ok(Estimate::Lag(lag))
    }
}

/// Split `channels` at the configured breakpoints; every segment keeps at
/// least one channel.
fn segment_bounds(channels: usize, config: &AlignmentConfig) -> Vec<(usize, usize)> {
    let at = |frac: f64| ((frac * channels as f64).floor() as usize).min(channels);
    let fractions = if config.bilinear {
        vec![(config.ref_low, config.ref_mid), (config.ref_mid, config.ref_high)]
    } else {
        vec![(config.ref_low, config.ref_high)]
    };

    fractions
        .into_iter()
        .map(|(lo, hi)| {
            let start = at(lo).min(channels - 1);
            let end = at(hi).max(start + 1);
            (start, end)
        })
        .collect()
}

/// Lags of one spectrum together with the residual of every pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentTrace {
    /// Accumulated lags
    pub lags: LagPair,
    /// Residual lag measured in each pass, in order
    pub steps: Vec<LagPair>,
}

/// Per-thread FFT cross-correlation lag estimator.
///
/// Holds the shared reference and its own scratch buffers. Transform plans
/// and the reference segment spectra are computed once at construction;
/// every transform goes through the shared guard.
pub struct AlignmentEstimator {
    reference: Arc<ReferenceSpectrum>,
    guard: Arc<SharedTransformGuard>,
    segments: Vec<Segment>,
    model: LagModel,
    iterations: usize,
    working: Vec<f64>,
    out_of_bound: u64,
    degenerate: u64,
    bound_stops: u64,
}

impl AlignmentEstimator {
    pub fn new(
        reference: Arc<ReferenceSpectrum>,
        config: &AlignmentConfig,
        guard: Arc<SharedTransformGuard>,
    ) -> Result<Self, AlignmentError> {
        config.validate()?;
        if reference.is_empty() {
            return Err(AlignmentError::EmptyReference);
        }

        let segments = segment_bounds(reference.len(), config)
            .into_iter()
            .map(|(start, end)| Segment::new(start, end, &reference, config, &guard))
            .collect::<Result<Vec<_>, _>>()?;

        let low_center = segments[0].center;
        let high_center = segments[segments.len() - 1].center;
        let channels = reference.len();

        Ok(Self {
            reference,
            guard,
            segments,
            model: LagModel {
                bilinear: config.bilinear,
                low_center,
                high_center,
            },
            iterations: config.iterations,
            working: vec![0.0; channels],
            out_of_bound: 0,
            degenerate: 0,
            bound_stops: 0,
        })
    }

    pub fn reference(&self) -> &ReferenceSpectrum {
        &self.reference
    }

    pub fn channels(&self) -> usize {
        self.reference.len()
    }

    /// Largest accepted lag per segment, in channels
    pub fn max_lags(&self) -> LagPair {
        let low = self.segments[0].max_lag;
        let high = self.segments[self.segments.len() - 1].max_lag;
        LagPair::new(low, high)
    }

    /// Per-pass estimates discarded for exceeding the maximum shift
    pub fn out_of_bound_count(&self) -> u64 {
        self.out_of_bound
    }

    /// Per-pass estimates discarded for non-finite samples or correlation
    pub fn degenerate_count(&self) -> u64 {
        self.degenerate
    }

    /// Refinements stopped because the accumulated lag would exceed the
    /// maximum shift
    pub fn bound_stop_count(&self) -> u64 {
        self.bound_stops
    }

    /// Estimate the lags of `spectrum` relative to the reference
    pub fn align_spectrum(&mut self, spectrum: &[f64]) -> Result<LagPair, AlignmentError> {
        self.refine(spectrum, None)
    }

    /// Like [`align_spectrum`](Self::align_spectrum), also returning the
    /// residual measured in every pass
    pub fn align_traced(&mut self, spectrum: &[f64]) -> Result<AlignmentTrace, AlignmentError> {
        let mut steps = Vec::with_capacity(self.iterations);
        let lags = self.refine(spectrum, Some(&mut steps))?;
        Ok(AlignmentTrace { lags, steps })
    }

    /// Resample `spectrum` in place so that content shifted by `lags` lines
    /// up with the reference
    pub fn correct_spectrum(
        &mut self,
        spectrum: &mut [f64],
        lags: LagPair,
    ) -> Result<(), AlignmentError> {
        self.check_len(spectrum.len())?;
        if lags.is_zero() {
            return Ok(());
        }
        self.working.copy_from_slice(spectrum);
        resample(&self.working, self.model, lags, spectrum);
        Ok(())
    }

    /// Estimate the lags of `spectrum` and correct it in place
    pub fn align_and_correct(&mut self, spectrum: &mut [f64]) -> Result<LagPair, AlignmentError> {
        let lags = self.align_spectrum(spectrum)?;
        self.correct_spectrum(spectrum, lags)?;
        Ok(lags)
    }

    fn check_len(&self, actual: usize) -> Result<(), AlignmentError> {
        if actual != self.reference.len() {
            return Err(AlignmentError::SpectrumLength {
                expected: self.reference.len(),
                actual,
            });
        }
        Ok(())
    }

    fn refine(
        &mut self,
        spectrum: &[f64],
        mut trace: Option<&mut Vec<LagPair>>,
    ) -> Result<LagPair, AlignmentError> {
        self.check_len(spectrum.len())?;
        self.working.copy_from_slice(spectrum);

        let mut total = LagPair::default();
        for pass in 0..self.iterations {
            let step = self.estimate_step()?;
            if let Some(steps) = trace.as_deref_mut() {
                steps.push(step);
            }
            if step.max_abs() < CONVERGED {
                break;
            }

            let candidate = total + step;
            if !self.within_bounds(candidate) {
                debug!(
                    "Accumulated lag ({:.3}, {:.3}) out of bound; keeping ({:.3}, {:.3})",
                    candidate.low, candidate.high, total.low, total.high
                );
                self.bound_stops += 1;
                break;
            }
            total = candidate;

            // Resample from the original spectrum, never the previous pass.
            if pass + 1 < self.iterations {
                resample(spectrum, self.model, total, &mut self.working);
            }
        }
        Ok(total)
    }

    /// One pass over all segments of the working spectrum
    fn estimate_step(&mut self) -> Result<LagPair, TransformError> {
        let mut lags = [0.0; 2];
        for (lag, segment) in lags.iter_mut().zip(self.segments.iter_mut()) {
            *lag = match segment.estimate(&self.working, &self.guard)? {
                Estimate::Lag(lag) => lag,
                Estimate::OutOfBound => {
                    self.out_of_bound += 1;
                    0.0
                }
                Estimate::Degenerate => {
                    self.degenerate += 1;
                    0.0
                }
            };
        }
        Ok(if self.model.bilinear {
            LagPair::new(lags[0], lags[1])
        } else {
            LagPair::uniform(lags[0])
        })
    }

    fn within_bounds(&self, lags: LagPair) -> bool {
        let bounds = self.max_lags();
        lags.low.abs() <= bounds.low && lags.high.abs() <= bounds.high
    }
}

impl std::fmt::Debug for AlignmentEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignmentEstimator")
            .field("channels", &self.reference.len())
            .field("segments", &self.segments.len())
            .field("bilinear", &self.model.bilinear)
            .field("iterations", &self.iterations)
            .finish()
    }
}
