use std::sync::Arc;

use log::{info, warn};

use crate::cube::{CubePlan, CubeSource};
use crate::dataset::DatasetDescriptor;
use crate::scheduler::{ProcessingError, ProcessingScheduler, RowProcessor, SchedulerStats};
use crate::transform::SharedTransformGuard;

use super::config::AlignmentConfig;
use super::error::AlignmentError;
use super::estimator::AlignmentEstimator;
use super::report::{LagReport, LagTable};
use super::reference::ReferenceSpectrum;

/// Worker-slot callback: align one row and record it in the table
struct AlignmentSlot<'a> {
    estimator: &'a mut AlignmentEstimator,
    table: &'a LagTable,
    correct: bool,
}

impl RowProcessor for AlignmentSlot<'_> {
    fn process_row(&mut self, pixel: usize, row: &mut [f64]) -> Result<(), ProcessingError> {
        let lags = if self.correct {
            self.estimator.align_and_correct(row)
        } else {
            self.estimator.align_spectrum(row)
        }
        .map_err(|err| err.into_processing(pixel))?;
        self.table.store(pixel, lags)
    }
}

/// Full-image alignment over a streamed dataset.
///
/// Owns one [`AlignmentEstimator`] per worker thread, all sharing a single
/// [`SharedTransformGuard`] and reference, plus the result table sized to the
/// dataset's pixel count.
///
/// # Example
///
/// ```rust,no_run
/// use msialign::align::{AlignmentConfig, AlignmentOrchestrator};
/// use msialign::synthetic::SyntheticDataset;
/// use msialign::dataset::DatasetDescriptor;
///
/// let data = SyntheticDataset::generate(&[100, 80], 2048, 2.0);
/// let descriptor = DatasetDescriptor::in_memory(data.rows_per_file(), 2048)?;
/// let config = AlignmentConfig::default().with_threads(4);
/// let orchestrator =
///     AlignmentOrchestrator::new(config, &descriptor, data.spectra.reference()?)?;
/// let report = orchestrator.run(&mut data.source()?)?;
/// assert_eq!(report.len(), 180);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct AlignmentOrchestrator {
    config: AlignmentConfig,
    guard: Arc<SharedTransformGuard>,
    estimators: Vec<AlignmentEstimator>,
    table: LagTable,
    scheduler: ProcessingScheduler,
}

impl AlignmentOrchestrator {
    /// Validate inputs and allocate estimators and the result table.
    ///
    /// Nothing is scheduled here; every configuration error surfaces before
    /// any thread exists.
    pub fn new(
        config: AlignmentConfig,
        descriptor: &DatasetDescriptor,
        reference: ReferenceSpectrum,
    ) -> Result<Self, AlignmentError> {
        config.validate()?;
        if reference.len() != descriptor.mass_channels() {
            return Err(AlignmentError::ChannelMismatch {
                reference: reference.len(),
                dataset: descriptor.mass_channels(),
            });
        }

        let reference = Arc::new(reference);
        let guard = SharedTransformGuard::shared();
        let estimators = (0..config.threads)
            .map(|_| AlignmentEstimator::new(Arc::clone(&reference), &config, Arc::clone(&guard)))
            .collect::<Result<Vec<_>, _>>()?;

        let table = LagTable::new(descriptor.total_pixels())?;
        let plan = config.cube_plan(descriptor);
        let scheduler = ProcessingScheduler::new(config.threads, plan)
            .map_err(|err| AlignmentError::InvalidConfig(err.to_string()))?
            .with_write_back(config.correct_spectra);

        info!(
            "Aligning {} pixels over {} mass channels ({} cubes, {} threads, {})",
            descriptor.total_pixels(),
            reference.len(),
            scheduler.plan().len(),
            config.threads,
            if config.bilinear { "bilinear" } else { "single segment" }
        );

        Ok(Self {
            config,
            guard,
            estimators,
            table,
            scheduler,
        })
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    pub fn plan(&self) -> &CubePlan {
        self.scheduler.plan()
    }

    /// Transform guard shared by every estimator of this run
    pub fn guard(&self) -> &Arc<SharedTransformGuard> {
        &self.guard
    }

    /// Align every pixel of `source`.
    ///
    /// On failure the lags written so far are returned inside
    /// [`AlignmentError::Aborted`].
    pub fn run<S: CubeSource + ?Sized>(self, source: &mut S) -> Result<LagReport, AlignmentError> {
        self.run_with_stats(source).map(|(report, _)| report)
    }

    /// Like [`run`](Self::run), also returning scheduler statistics
    pub fn run_with_stats<S: CubeSource + ?Sized>(
        mut self,
        source: &mut S,
    ) -> Result<(LagReport, SchedulerStats), AlignmentError> {
        let channels = self.estimators.first().map_or(0, |e| e.channels());
        if source.channels() != channels {
            return Err(AlignmentError::ChannelMismatch {
                reference: channels,
                dataset: source.channels(),
            });
        }

        let table = &self.table;
        let correct = self.config.correct_spectra;
        let mut slots: Vec<AlignmentSlot<'_>> = self
            .estimators
            .iter_mut()
            .map(|estimator| AlignmentSlot {
                estimator,
                table,
                correct,
            })
            .collect();
        let outcome = self.scheduler.run(source, &mut slots);
        drop(slots);

        let out_of_bound: u64 = self.estimators.iter().map(|e| e.out_of_bound_count()).sum();
        if out_of_bound > 0 {
            warn!(
                "{} lag estimates exceeded {} ppm and were treated as zero shift",
                out_of_bound, self.config.max_shift_ppm
            );
        }
        let bound_stops: u64 = self.estimators.iter().map(|e| e.bound_stop_count()).sum();
        if bound_stops > 0 {
            warn!(
                "{} refinements stopped at {} ppm and kept their previous lag",
                bound_stops, self.config.max_shift_ppm
            );
        }
        let degenerate: u64 = self.estimators.iter().map(|e| e.degenerate_count()).sum();
        if degenerate > 0 {
            warn!(
                "{} lag estimates hit non-finite samples and were treated as zero shift",
                degenerate
            );
        }

        match outcome {
            Ok(stats) => {
                info!(
                    "Alignment finished: {:.0} pixels/s, {} transforms",
                    stats.throughput(),
                    self.guard.executions()
                );
                let report = self
                    .table
                    .into_report()
                    .map_err(|partial| AlignmentError::Incomplete {
                        missing: partial.len() - partial.written_count(),
                    })?;
                Ok((report, stats))
            }
            Err(source) => Err(AlignmentError::Aborted {
                source,
                partial: self.table.into_partial(),
            }),
        }
    }
}

impl std::fmt::Debug for AlignmentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignmentOrchestrator")
            .field("config", &self.config)
            .field("estimators", &self.estimators.len())
            .field("pixels", &self.table.len())
            .field("cubes", &self.scheduler.plan().len())
            .finish()
    }
}
