use crate::cube::CubeError;
use crate::transform::TransformError;

/// Errors that can occur while driving the worker pool
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// The pool needs at least one worker
    #[error("Thread count must be at least 1")]
    InvalidThreadCount,

    /// One row processor is required per worker slot
    #[error("Expected {expected} row processors, got {actual}")]
    ProcessorCountMismatch {
        /// Configured thread count
        expected: usize,
        /// Processors supplied
        actual: usize,
    },

    /// Loading or storing a cube failed
    #[error("Cube error: {0}")]
    Cube(#[from] CubeError),

    /// The transform engine failed inside a worker
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// A row failed to process
    #[error("Pixel {pixel}: {message}")]
    Row {
        /// Global pixel index of the failing row
        pixel: usize,
        /// Description of the failure
        message: String,
    },

    /// A result slot was written twice
    #[error("Pixel {0} written more than once")]
    DuplicatePixel(usize),

    /// A global pixel index outside the dataset
    #[error("Pixel {pixel} out of range (dataset has {total} pixels)")]
    PixelOutOfRange {
        /// Offending index
        pixel: usize,
        /// Total pixel count
        total: usize,
    },

    /// The worker stopped early because another slot failed
    #[error("Cancelled after a failure in another worker")]
    Cancelled,

    /// A row processor panicked
    #[error("Worker {slot} panicked")]
    WorkerPanicked {
        /// Slot of the panicking worker
        slot: usize,
    },

    /// A worker thread is no longer reachable
    #[error("Worker {slot} exited unexpectedly")]
    WorkerExited {
        /// Slot of the lost worker
        slot: usize,
    },

    /// The completion channel closed before every slot reported back
    #[error("Only {received} of {expected} workers reported back")]
    CompletionsLost {
        /// Completions received this round
        received: usize,
        /// Worker slots in the pool
        expected: usize,
    },

    /// The operating system refused to create a worker thread
    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}
