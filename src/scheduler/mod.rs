//! # Processing scheduler
//!
//! A generic worker pool that streams a dataset through a fixed number of
//! threads in lock-step rounds, holding at most one cube per thread in
//! memory. The per-pixel work is supplied as one [`RowProcessor`] per worker
//! slot.

mod error;
mod pool;
mod stats;

#[cfg(test)]
mod tests;

pub use error::ProcessingError;
pub use pool::{ProcessingScheduler, RowProcessor};
pub use stats::SchedulerStats;
