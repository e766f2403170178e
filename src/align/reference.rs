use super::error::AlignmentError;

/// Mass axis and intensities every spectrum is aligned against.
///
/// Shared read-only by all estimators of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSpectrum {
    mass: Vec<f64>,
    intensity: Vec<f64>,
}

impl ReferenceSpectrum {
    /// Validate and build a reference.
    ///
    /// The mass axis must be finite and strictly increasing, and both
    /// vectors must have one value per mass channel.
    pub fn new(mass: Vec<f64>, intensity: Vec<f64>) -> Result<Self, AlignmentError> {
        if mass.len() != intensity.len() {
            return Err(AlignmentError::ReferenceLength {
                mass: mass.len(),
                intensity: intensity.len(),
            });
        }
        if mass.is_empty() {
            return Err(AlignmentError::EmptyReference);
        }
        if let Some(pos) = mass.iter().position(|m| !m.is_finite()) {
            return Err(AlignmentError::InvalidMassAxis(pos));
        }
        if let Some(pos) = mass.windows(2).position(|w| w[1] <= w[0]) {
            return Err(AlignmentError::InvalidMassAxis(pos + 1));
        }
        if let Some(pos) = intensity.iter().position(|v| !v.is_finite()) {
            return Err(AlignmentError::NonFiniteIntensity(pos));
        }
        Ok(Self { mass, intensity })
    }

    pub fn mass(&self) -> &[f64] {
        &self.mass
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    /// Number of mass channels
    pub fn len(&self) -> usize {
        self.mass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    /// Mass spacing around `channel`, from its neighbours
    pub(crate) fn spacing_at(&self, channel: usize) -> f64 {
        let n = self.mass.len();
        if n < 2 {
            return 0.0;
        }
        let lo = channel.min(n - 1).saturating_sub(1);
        let hi = (channel + 1).min(n - 1);
        if hi <= lo {
            return 0.0;
        }
        (self.mass[hi] - self.mass[lo]) / (hi - lo) as f64
    }
}
