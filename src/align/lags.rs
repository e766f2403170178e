use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Lags of one spectrum, in mass channels.
///
/// Positive values mean the spectrum sits at higher channels than the
/// reference. Without bilinear mode both values are equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LagPair {
    pub low: f64,
    pub high: f64,
}

impl LagPair {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Same lag for both segments
    pub fn uniform(lag: f64) -> Self {
        Self::new(lag, lag)
    }

    /// Largest absolute component
    pub fn max_abs(&self) -> f64 {
        self.low.abs().max(self.high.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.low == 0.0 && self.high == 0.0
    }
}

impl Add for LagPair {
    type Output = LagPair;

    fn add(self, rhs: LagPair) -> LagPair {
        LagPair::new(self.low + rhs.low, self.high + rhs.high)
    }
}

impl Sub for LagPair {
    type Output = LagPair;

    fn sub(self, rhs: LagPair) -> LagPair {
        LagPair::new(self.low - rhs.low, self.high - rhs.high)
    }
}
