use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::cube::{Cube, CubePlan, CubeSource};

use super::error::ProcessingError;
use super::stats::SchedulerStats;

/// Rounds between progress log lines
const PROGRESS_ROUNDS: usize = 50;

/// Per-slot work function, invoked once per row of the slot's current cube.
///
/// Each worker thread owns one processor for the whole run, so processors
/// may keep mutable scratch state without locking.
pub trait RowProcessor: Send {
    /// Process the spectrum of global pixel `pixel`.
    ///
    /// `row` may be modified in place; modifications are persisted only when
    /// the scheduler runs with write-back enabled.
    fn process_row(&mut self, pixel: usize, row: &mut [f64]) -> Result<(), ProcessingError>;
}

impl<F> RowProcessor for F
where
    F: FnMut(usize, &mut [f64]) -> Result<(), ProcessingError> + Send,
{
    fn process_row(&mut self, pixel: usize, row: &mut [f64]) -> Result<(), ProcessingError> {
        self(pixel, row)
    }
}

/// Work handed to a slot at the start of a round
enum Assignment {
    Process(Cube),
    Idle,
}

/// Report sent back by a slot at the end of a round
struct Completion {
    slot: usize,
    cube: Option<Cube>,
    rows: usize,
    result: Result<(), ProcessingError>,
}

/// Fixed-size worker pool driving synchronized rounds over a cube plan.
///
/// # Rounds
///
/// ```text
///  coordinator          slot 0 .. slot T-1
///  ───────────          ──────────────────
///  load ≤T cubes
///  ── release ───────▶  process rows (or idle)
///  ◀─ completions ────  (all T report back)
///  write back, drop
/// ```
///
/// Loads happen on the calling thread in plan order, so no more than T cubes
/// are ever alive. Workers are spawned once per [`run`](Self::run) and reused
/// for every round; a slot without a cube still reports back, so uneven file
/// sizes never leave the pool waiting.
///
/// # Failure
///
/// The first error (or panic) in any slot raises a cancellation flag that the
/// other slots check between rows. The round still completes, the error is
/// returned after all workers have been joined, and nothing is written back
/// for that round.
#[derive(Debug, Clone)]
pub struct ProcessingScheduler {
    threads: usize,
    plan: CubePlan,
    write_back: bool,
}

impl ProcessingScheduler {
    /// Create a scheduler for `threads` workers over `plan`
    pub fn new(threads: usize, plan: CubePlan) -> Result<Self, ProcessingError> {
        if threads == 0 {
            return Err(ProcessingError::InvalidThreadCount);
        }
        Ok(Self {
            threads,
            plan,
            write_back: false,
        })
    }

    /// Persist modified cubes through [`CubeSource::store_cube`] after each round
    pub fn with_write_back(mut self, write_back: bool) -> Self {
        self.write_back = write_back;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn plan(&self) -> &CubePlan {
        &self.plan
    }

    pub fn total_pixels(&self) -> usize {
        self.plan.total_pixels()
    }

    /// Process every cube of the plan.
    ///
    /// `processors` must hold exactly one processor per thread; processor `i`
    /// is used only by worker slot `i`.
    pub fn run<S, P>(
        &self,
        source: &mut S,
        processors: &mut [P],
    ) -> Result<SchedulerStats, ProcessingError>
    where
        S: CubeSource + ?Sized,
        P: RowProcessor,
    {
        if processors.len() != self.threads {
            return Err(ProcessingError::ProcessorCountMismatch {
                expected: self.threads,
                actual: processors.len(),
            });
        }

        info!(
            "Processing {} pixels in {} cubes with {} threads",
            self.plan.total_pixels(),
            self.plan.len(),
            self.threads
        );

        let start = Instant::now();
        let cancelled = AtomicBool::new(false);
        let (done_tx, done_rx) = bounded::<Completion>(self.threads);

        let result = thread::scope(|scope| {
            let mut assign = Vec::with_capacity(self.threads);
            for (slot, processor) in processors.iter_mut().enumerate() {
                let (tx, rx) = bounded::<Assignment>(1);
                let done_tx = done_tx.clone();
                let cancelled = &cancelled;
                thread::Builder::new()
                    .name(format!("msialign-worker-{slot}"))
                    .spawn_scoped(scope, move || {
                        worker_loop(slot, processor, rx, done_tx, cancelled)
                    })
                    .map_err(ProcessingError::ThreadSpawn)?;
                assign.push(tx);
            }
            drop(done_tx);

            // Dropping `assign` on return releases every worker.
            self.coordinate(source, &assign, &done_rx)
        });

        match result {
            Ok(mut stats) => {
                stats.elapsed = start.elapsed();
                info!("{}", stats);
                Ok(stats)
            }
            Err(err) => {
                error!("Processing aborted: {}", err);
                Err(err)
            }
        }
    }

    fn coordinate<S>(
        &self,
        source: &mut S,
        assign: &[Sender<Assignment>],
        done: &Receiver<Completion>,
    ) -> Result<SchedulerStats, ProcessingError>
    where
        S: CubeSource + ?Sized,
    {
        let mut stats = SchedulerStats::default();
        let mut spans = self.plan.spans().iter();

        loop {
            // Load phase: fill slots in plan order until input runs out or fails.
            let mut load_error = None;
            let mut loaded = Vec::with_capacity(self.threads);
            for _ in 0..self.threads {
                let span = match (&load_error, spans.next()) {
                    (None, Some(span)) => span,
                    _ => {
                        loaded.push(None);
                        continue;
                    }
                };
                match source.load_cube(span) {
                    Ok(cube) => {
                        debug!(
                            "Loaded cube {} (file {}, rows {}..{})",
                            span.index,
                            span.file,
                            span.first_row,
                            span.end_row()
                        );
                        loaded.push(Some(cube));
                    }
                    Err(err) => {
                        warn!("Failed to load cube {}: {}", span.index, err);
                        load_error = Some(err);
                        loaded.push(None);
                    }
                }
            }

            let active = loaded.iter().filter(|cube| cube.is_some()).count();
            if active == 0 {
                return match load_error {
                    Some(err) => Err(err.into()),
                    None => Ok(stats),
                };
            }

            // Release phase: every slot gets a cube or an idle token.
            for (slot, cube) in loaded.into_iter().enumerate() {
                let assignment = match cube {
                    Some(cube) => Assignment::Process(cube),
                    None => Assignment::Idle,
                };
                assign[slot]
                    .send(assignment)
                    .map_err(|_| ProcessingError::WorkerExited { slot })?;
            }

            // Completion phase: wait for all T slots.
            let mut failure = None;
            let mut finished = Vec::with_capacity(active);
            for completion in collect_round(done, self.threads)? {
                stats.rows += completion.rows;
                match (completion.result, completion.cube) {
                    (Ok(()), Some(cube)) => finished.push(cube),
                    (Ok(()), None) => stats.idle_slot_rounds += 1,
                    (Err(ProcessingError::Cancelled), _) => {}
                    (Err(err), _) => {
                        warn!("Worker {} failed: {}", completion.slot, err);
                        failure.get_or_insert(err);
                    }
                }
            }
            stats.rounds += 1;

            if let Some(err) = failure {
                return Err(err);
            }
            stats.cubes += finished.len();

            if self.write_back {
                finished.sort_by_key(|cube| cube.span().index);
                for cube in &finished {
                    source.store_cube(cube)?;
                }
            }
            drop(finished);

            if let Some(err) = load_error {
                return Err(err.into());
            }

            if stats.rounds % PROGRESS_ROUNDS == 0 && !self.plan.is_empty() {
                let pct = stats.cubes as f64 / self.plan.len() as f64 * 100.0;
                info!(
                    "Progress: {}/{} cubes ({:.1}%)",
                    stats.cubes,
                    self.plan.len(),
                    pct
                );
            }
        }
    }
}

/// Receive one completion from each of the `threads` slots
fn collect_round(
    done: &Receiver<Completion>,
    threads: usize,
) -> Result<Vec<Completion>, ProcessingError> {
    let mut completions = Vec::with_capacity(threads);
    while completions.len() < threads {
        let completion = done.recv().map_err(|_| ProcessingError::CompletionsLost {
            received: completions.len(),
            expected: threads,
        })?;
        completions.push(completion);
    }
    Ok(completions)
}

fn worker_loop<P: RowProcessor>(
    slot: usize,
    processor: &mut P,
    assignments: Receiver<Assignment>,
    completions: Sender<Completion>,
    cancelled: &AtomicBool,
) {
    for assignment in assignments.iter() {
        let completion = match assignment {
            Assignment::Idle => Completion {
                slot,
                cube: None,
                rows: 0,
                result: Ok(()),
            },
            Assignment::Process(mut cube) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    process_cube(processor, &mut cube, cancelled)
                }));
                let (rows, result) = outcome.unwrap_or_else(|_| {
                    error!("Worker {} panicked in cube {}", slot, cube.span().index);
                    (0, Err(ProcessingError::WorkerPanicked { slot }))
                });
                if matches!(&result, Err(err) if !matches!(err, ProcessingError::Cancelled)) {
                    cancelled.store(true, Ordering::Relaxed);
                }
                Completion {
                    slot,
                    cube: Some(cube),
                    rows,
                    result,
                }
            }
        };

        if completions.send(completion).is_err() {
            break;
        }
    }
}

fn process_cube<P: RowProcessor>(
    processor: &mut P,
    cube: &mut Cube,
    cancelled: &AtomicBool,
) -> (usize, Result<(), ProcessingError>) {
    let mut rows = 0;
    for (pixel, row) in cube.rows_mut() {
        if cancelled.load(Ordering::Relaxed) {
            return (rows, Err(ProcessingError::Cancelled));
        }
        if let Err(err) = processor.process_row(pixel, row) {
            return (rows, Err(err));
        }
        rows += 1;
    }
    (rows, Ok(()))
}
