use std::path::PathBuf;

/// Errors that can occur while loading or storing cubes
#[derive(Debug, thiserror::Error)]
pub enum CubeError {
    /// I/O error on a dataset file
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The requested span does not exist in the dataset
    #[error("Cube span out of range: file {file}, rows {first_row}..{end_row}")]
    OutOfRange {
        /// File index of the span
        file: usize,
        /// First in-file row of the span
        first_row: usize,
        /// One past the last in-file row of the span
        end_row: usize,
    },

    /// The data handed over does not match the dataset shape
    #[error("Invalid cube data: {0}")]
    InvalidData(String),

    /// The source does not accept corrected spectra
    #[error("Cube source is read-only")]
    ReadOnly,
}
