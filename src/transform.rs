//! # Shared transform guard
//!
//! The Fourier transform engine is treated as non-reentrant: planning and
//! executing transforms must never overlap between threads. A single
//! [`SharedTransformGuard`] is created per run and handed by reference
//! (`Arc`) to every estimator; it is the only lock taken inside the
//! per-spectrum alignment path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Errors raised by the transform engine
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Another thread panicked while holding the transform lock
    #[error("Transform lock poisoned")]
    Poisoned,

    /// Buffer does not match the plan length
    #[error("Transform length mismatch: plan {expected}, buffer {actual}")]
    LengthMismatch {
        /// Plan length
        expected: usize,
        /// Buffer length
        actual: usize,
    },
}

/// Direction of a planned transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformDirection {
    Forward,
    Inverse,
}

/// A transform plan created under the guard
#[derive(Clone)]
pub struct TransformPlan {
    fft: Arc<dyn Fft<f64>>,
}

impl TransformPlan {
    pub fn len(&self) -> usize {
        self.fft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fft.len() == 0
    }

    /// Scratch length required by [`SharedTransformGuard::execute`]
    pub fn scratch_len(&self) -> usize {
        self.fft.get_inplace_scratch_len()
    }
}

impl std::fmt::Debug for TransformPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPlan")
            .field("len", &self.fft.len())
            .field("direction", &self.fft.fft_direction())
            .finish()
    }
}

type PlanCache = HashMap<(usize, TransformDirection), Arc<dyn Fft<f64>>>;

/// Single mutual-exclusion lock around all transform planning and execution.
///
/// Plans are cached by length and direction, so estimators with equal
/// segment sizes share them.
pub struct SharedTransformGuard {
    plans: Mutex<PlanCache>,
    plans_created: AtomicU64,
    executions: AtomicU64,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl SharedTransformGuard {
    pub fn new() -> Self {
        Self {
            plans: Mutex::new(HashMap::new()),
            plans_created: AtomicU64::new(0),
            executions: AtomicU64::new(0),
            running: AtomicUsize::new(0),
            peak_running: AtomicUsize::new(0),
        }
    }

    /// Convenience constructor for sharing across estimators
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> Result<MutexGuard<'_, PlanCache>, TransformError> {
        self.plans.lock().map_err(|_| TransformError::Poisoned)
    }

    /// Plan a transform of `len` points
    pub fn plan(
        &self,
        len: usize,
        direction: TransformDirection,
    ) -> Result<TransformPlan, TransformError> {
        let mut plans = self.lock()?;
        let fft = plans
            .entry((len, direction))
            .or_insert_with(|| {
                self.plans_created.fetch_add(1, Ordering::Relaxed);
                let mut planner = FftPlanner::new();
                match direction {
                    TransformDirection::Forward => planner.plan_fft_forward(len),
                    TransformDirection::Inverse => planner.plan_fft_inverse(len),
                }
            })
            .clone();
        Ok(TransformPlan { fft })
    }

    /// Run `plan` in place on `buffer` (unnormalised).
    ///
    /// `scratch` must hold at least [`TransformPlan::scratch_len`] elements.
    pub fn execute(
        &self,
        plan: &TransformPlan,
        buffer: &mut [Complex<f64>],
        scratch: &mut [Complex<f64>],
    ) -> Result<(), TransformError> {
        if buffer.len() != plan.len() {
            return Err(TransformError::LengthMismatch {
                expected: plan.len(),
                actual: buffer.len(),
            });
        }
        let needed = plan.scratch_len();
        if scratch.len() < needed {
            return Err(TransformError::LengthMismatch {
                expected: needed,
                actual: scratch.len(),
            });
        }

        let _engine = self.lock()?;
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(running, Ordering::SeqCst);
        plan.fft.process_with_scratch(buffer, &mut scratch[..needed]);
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.executions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of distinct plans created so far
    pub fn plans_created(&self) -> u64 {
        self.plans_created.load(Ordering::Relaxed)
    }

    /// Number of transforms executed so far
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Largest number of transforms ever seen running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }
}

impl Default for SharedTransformGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedTransformGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTransformGuard")
            .field("plans_created", &self.plans_created())
            .field("executions", &self.executions())
            .field("peak_concurrency", &self.peak_concurrency())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_forward_inverse_roundtrip_scaled() {
        let guard = SharedTransformGuard::new();
        let forward = guard.plan(8, TransformDirection::Forward).unwrap();
        let inverse = guard.plan(8, TransformDirection::Inverse).unwrap();
        let scratch_len = forward.scratch_len().max(inverse.scratch_len());
        let mut scratch = vec![Complex::default(); scratch_len];

        let input: Vec<Complex<f64>> = (0..8).map(|i| Complex::new(i as f64, 0.0)).collect();
        let mut buffer = input.clone();
        guard.execute(&forward, &mut buffer, &mut scratch).unwrap();
        guard.execute(&inverse, &mut buffer, &mut scratch).unwrap();

        for (out, orig) in buffer.iter().zip(&input) {
            assert!((out.re / 8.0 - orig.re).abs() < 1e-12);
            assert!(out.im.abs() < 1e-12);
        }
        assert_eq!(guard.plans_created(), 2);
        assert_eq!(guard.executions(), 2);
        assert_eq!(guard.peak_concurrency(), 1);

        guard.plan(8, TransformDirection::Forward).unwrap();
        assert_eq!(guard.plans_created(), 2);
    }

    #[test]
    fn test_length_mismatch() {
        let guard = SharedTransformGuard::new();
        let plan = guard.plan(4, TransformDirection::Forward).unwrap();
        let mut buffer = vec![Complex::default(); 5];
        let mut scratch = vec![Complex::default(); plan.scratch_len()];
        let result = guard.execute(&plan, &mut buffer, &mut scratch);
        assert!(matches!(
            result,
            Err(TransformError::LengthMismatch {
                expected: 4,
                actual: 5
            })
        ));
        assert_eq!(guard.executions(), 0);
    }

    #[test]
    fn test_shared_across_threads() {
        let guard = SharedTransformGuard::shared();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let guard = Arc::clone(&guard);
                thread::spawn(move || {
                    let plan = guard.plan(4096, TransformDirection::Forward).unwrap();
                    let mut scratch = vec![Complex::default(); plan.scratch_len()];
                    for _ in 0..25 {
                        let mut buffer = vec![Complex::new(1.0, 0.0); 4096];
                        guard.execute(&plan, &mut buffer, &mut scratch).unwrap();
                        assert!((buffer[0].re - 4096.0).abs() < 1e-9);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(guard.executions(), 100);
        assert_eq!(guard.plans_created(), 1);
        assert_eq!(guard.peak_concurrency(), 1);
    }
}
