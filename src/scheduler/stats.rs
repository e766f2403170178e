use std::fmt;
use std::time::Duration;

/// Statistics from a completed scheduler run
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    /// Number of synchronized rounds
    pub rounds: usize,
    /// Cubes processed
    pub cubes: usize,
    /// Rows (pixels) processed
    pub rows: usize,
    /// Slot-rounds in which a worker had no cube
    pub idle_slot_rounds: usize,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl SchedulerStats {
    /// Rows per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rows as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} pixels in {} cubes over {} rounds ({:.2}s, {} idle slot-rounds)",
            self.rows,
            self.cubes,
            self.rounds,
            self.elapsed.as_secs_f64(),
            self.idle_slot_rounds
        )
    }
}
