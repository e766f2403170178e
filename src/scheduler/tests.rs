use super::*;
use crate::cube::{Cube, CubeError, CubePlan, CubeSource, CubeSpan, InMemorySource};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn source_with(rows_per_file: &[usize], channels: usize) -> InMemorySource {
    let mut pixel = 0;
    let files = rows_per_file
        .iter()
        .map(|&rows| {
            (0..rows)
                .map(|_| {
                    let row = vec![pixel as f64; channels];
                    pixel += 1;
                    row
                })
                .collect()
        })
        .collect();
    InMemorySource::from_rows(channels, files).unwrap()
}

/// Records every pixel it sees and checks the row content matches the index
struct Recorder<'a> {
    seen: &'a Mutex<Vec<usize>>,
}

impl RowProcessor for Recorder<'_> {
    fn process_row(&mut self, pixel: usize, row: &mut [f64]) -> Result<(), ProcessingError> {
        if row[0] != pixel as f64 {
            return Err(ProcessingError::Row {
                pixel,
                message: format!("row holds pixel {}", row[0]),
            });
        }
        self.seen.lock().unwrap().push(pixel);
        Ok(())
    }
}

fn run_recorded(rows_per_file: &[usize], rows_per_cube: usize, threads: usize) -> Vec<usize> {
    let mut source = source_with(rows_per_file, 3);
    let plan = CubePlan::new(rows_per_file, rows_per_cube);
    let scheduler = ProcessingScheduler::new(threads, plan).unwrap();

    let seen = Mutex::new(Vec::new());
    let mut processors: Vec<_> = (0..threads).map(|_| Recorder { seen: &seen }).collect();
    let stats = scheduler.run(&mut source, &mut processors).unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(stats.rows, seen.len());
    seen
}

#[test]
fn test_every_pixel_processed_once() {
    let rows = [7, 0, 12, 1, 5];
    for threads in [1, 2, 3, 8] {
        let mut seen = run_recorded(&rows, 2, threads);
        seen.sort_unstable();
        assert_eq!(seen, (0..25).collect::<Vec<_>>(), "threads = {threads}");
    }
}

#[test]
fn test_more_threads_than_cubes() {
    let mut source = source_with(&[2], 3);
    let plan = CubePlan::new(&[2], 10);
    let scheduler = ProcessingScheduler::new(8, plan).unwrap();

    let seen = Mutex::new(Vec::new());
    let mut processors: Vec<_> = (0..8).map(|_| Recorder { seen: &seen }).collect();
    let stats = scheduler.run(&mut source, &mut processors).unwrap();

    assert_eq!(stats.rounds, 1);
    assert_eq!(stats.cubes, 1);
    assert_eq!(stats.rows, 2);
    assert_eq!(stats.idle_slot_rounds, 7);
}

#[test]
fn test_empty_plan_terminates() {
    let mut source = source_with(&[0, 0], 3);
    let scheduler = ProcessingScheduler::new(4, CubePlan::new(&[0, 0], 10)).unwrap();

    let mut processors: Vec<_> = (0..4)
        .map(|_| |_pixel: usize, _row: &mut [f64]| -> Result<(), ProcessingError> { Ok(()) })
        .collect();
    let stats = scheduler.run(&mut source, &mut processors).unwrap();
    assert_eq!(stats.rounds, 0);
    assert_eq!(stats.rows, 0);
}

#[test]
fn test_rounds_bounded_by_threads() {
    // 10 cubes over 3 threads need 4 rounds
    let mut source = source_with(&[10], 1);
    let scheduler = ProcessingScheduler::new(3, CubePlan::new(&[10], 1)).unwrap();

    let mut processors: Vec<_> = (0..3)
        .map(|_| |_pixel: usize, _row: &mut [f64]| -> Result<(), ProcessingError> { Ok(()) })
        .collect();
    let stats = scheduler.run(&mut source, &mut processors).unwrap();
    assert_eq!(stats.rounds, 4);
    assert_eq!(stats.cubes, 10);
    assert_eq!(stats.idle_slot_rounds, 2);
}

#[test]
fn test_zero_threads_rejected() {
    let result = ProcessingScheduler::new(0, CubePlan::new(&[1], 1));
    assert!(matches!(result, Err(ProcessingError::InvalidThreadCount)));
}

#[test]
fn test_processor_count_mismatch() {
    let mut source = source_with(&[1], 1);
    let scheduler = ProcessingScheduler::new(2, CubePlan::new(&[1], 1)).unwrap();
    let mut processors = vec![|_pixel: usize, _row: &mut [f64]| -> Result<(), ProcessingError> {
        Ok(())
    }];
    let result = scheduler.run(&mut source, &mut processors);
    assert!(matches!(
        result,
        Err(ProcessingError::ProcessorCountMismatch {
            expected: 2,
            actual: 1
        })
    ));
}

#[test]
fn test_row_error_propagates_and_stops() {
    let mut source = source_with(&[40], 1);
    let scheduler = ProcessingScheduler::new(4, CubePlan::new(&[40], 5)).unwrap();
    let processed = AtomicUsize::new(0);

    let mut processors: Vec<_> = (0..4)
        .map(|_| {
            let processed = &processed;
            move |pixel: usize, _row: &mut [f64]| -> Result<(), ProcessingError> {
                if pixel == 12 {
                    return Err(ProcessingError::Row {
                        pixel,
                        message: "bad spectrum".to_string(),
                    });
                }
                processed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        })
        .collect();

    let result = scheduler.run(&mut source, &mut processors);
    assert!(matches!(result, Err(ProcessingError::Row { pixel: 12, .. })));
    // The failing cube is in the first round; later rounds never start.
    assert!(processed.load(Ordering::Relaxed) < 20);
}

#[test]
fn test_panic_is_captured() {
    let mut source = source_with(&[6], 1);
    let scheduler = ProcessingScheduler::new(2, CubePlan::new(&[6], 3)).unwrap();

    let mut processors: Vec<_> = (0..2)
        .map(|_| {
            |pixel: usize, _row: &mut [f64]| -> Result<(), ProcessingError> {
                if pixel == 4 {
                    panic!("boom");
                }
                Ok(())
            }
        })
        .collect();

    let result = scheduler.run(&mut source, &mut processors);
    assert!(matches!(
        result,
        Err(ProcessingError::WorkerPanicked { slot: 1 })
    ));
}

/// Source that fails to load one particular cube
struct FailingSource {
    inner: InMemorySource,
    fail_at: usize,
}

impl CubeSource for FailingSource {
    fn channels(&self) -> usize {
        self.inner.channels()
    }

    fn load_cube(&mut self, span: &CubeSpan) -> Result<Cube, CubeError> {
        if span.index == self.fail_at {
            return Err(CubeError::InvalidData("corrupt block".to_string()));
        }
        self.inner.load_cube(span)
    }
}

#[test]
fn test_load_error_after_round_completes() {
    let mut source = FailingSource {
        inner: source_with(&[10], 1),
        fail_at: 5,
    };
    let scheduler = ProcessingScheduler::new(2, CubePlan::new(&[10], 1)).unwrap();

    let seen = Mutex::new(HashSet::new());
    let mut processors: Vec<_> = (0..2)
        .map(|_| {
            let seen = &seen;
            move |pixel: usize, _row: &mut [f64]| -> Result<(), ProcessingError> {
                seen.lock().unwrap().insert(pixel);
                Ok(())
            }
        })
        .collect();

    let result = scheduler.run(&mut source, &mut processors);
    assert!(matches!(
        result,
        Err(ProcessingError::Cube(CubeError::InvalidData(_)))
    ));
    // Cube 4 shares the round with the failed load and is still processed.
    let seen = seen.into_inner().unwrap();
    assert_eq!(seen, (0..5).collect::<HashSet<_>>());
}

#[test]
fn test_write_back_persists_rows() {
    let mut source = source_with(&[3, 2], 2);
    let scheduler = ProcessingScheduler::new(2, CubePlan::new(&[3, 2], 2))
        .unwrap()
        .with_write_back(true);

    let mut processors: Vec<_> = (0..2)
        .map(|_| {
            |pixel: usize, row: &mut [f64]| -> Result<(), ProcessingError> {
                row.iter_mut().for_each(|v| *v = -(pixel as f64));
                Ok(())
            }
        })
        .collect();
    scheduler.run(&mut source, &mut processors).unwrap();

    assert_eq!(source.row(0, 2).unwrap(), &[-2.0, -2.0]);
    assert_eq!(source.row(1, 1).unwrap(), &[-4.0, -4.0]);
}

#[test]
fn test_without_write_back_source_untouched() {
    let mut source = source_with(&[2], 2);
    let scheduler = ProcessingScheduler::new(1, CubePlan::new(&[2], 2)).unwrap();

    let mut processors = vec![|_pixel: usize, row: &mut [f64]| -> Result<(), ProcessingError> {
        row.fill(0.5);
        Ok(())
    }];
    scheduler.run(&mut source, &mut processors).unwrap();
    assert_eq!(source.row(0, 1).unwrap(), &[1.0, 1.0]);
}

#[test]
fn test_slot_processor_state_is_private() {
    // Each slot counts its own rows; the counts must add up.
    let mut source = source_with(&[9, 4], 1);
    let scheduler = ProcessingScheduler::new(3, CubePlan::new(&[9, 4], 2)).unwrap();

    struct Counter(usize);
    impl RowProcessor for Counter {
        fn process_row(&mut self, _pixel: usize, _row: &mut [f64]) -> Result<(), ProcessingError> {
            self.0 += 1;
            Ok(())
        }
    }

    let mut processors: Vec<_> = (0..3).map(|_| Counter(0)).collect();
    scheduler.run(&mut source, &mut processors).unwrap();
    assert_eq!(processors.iter().map(|c| c.0).sum::<usize>(), 13);
}
