//! Resampling of spectra along a shifted channel axis.

use super::lags::LagPair;

/// Lag as a function of channel position.
///
/// Constant in single-segment mode; in bilinear mode a straight line through
/// the two segment centres, extrapolated beyond them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LagModel {
    pub(crate) bilinear: bool,
    pub(crate) low_center: f64,
    pub(crate) high_center: f64,
}

impl LagModel {
    pub(crate) fn lag_at(&self, lags: LagPair, channel: f64) -> f64 {
        if !self.bilinear {
            return lags.low;
        }
        let span = self.high_center - self.low_center;
        if span.abs() < f64::EPSILON {
            return 0.5 * (lags.low + lags.high);
        }
        lags.low + (lags.high - lags.low) * (channel - self.low_center) / span
    }
}

/// Write `source` sampled at `i + lag(i)` into `out`.
///
/// A positive lag means the source content sits at higher channels than the
/// reference, so sampling ahead moves it back into place.
pub(crate) fn resample(source: &[f64], model: LagModel, lags: LagPair, out: &mut [f64]) {
    for (i, value) in out.iter_mut().enumerate() {
        let x = i as f64 + model.lag_at(lags, i as f64);
        *value = catmull_rom(source, x);
    }
}

/// Cubic Catmull-Rom interpolation of `samples` at fractional index `x`.
///
/// Returns 0 outside `[0, len - 1]`; edge samples are repeated for the
/// outer control points.
pub(crate) fn catmull_rom(samples: &[f64], x: f64) -> f64 {
    let n = samples.len();
    if n == 0 || !x.is_finite() || x < 0.0 || x > (n - 1) as f64 {
        return 0.0;
    }
    let i = (x.floor() as usize).min(n - 1);
    let t = x - i as f64;
    if t == 0.0 {
        return samples[i];
    }

    let p0 = samples[i.saturating_sub(1)];
    let p1 = samples[i];
    let p2 = samples[(i + 1).min(n - 1)];
    let p3 = samples[(i + 2).min(n - 1)];

    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}
