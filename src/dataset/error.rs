/// Errors raised while describing a dataset, before any cube is loaded
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The per-file row count list does not match the file list
    #[error("{files} files but {row_counts} row counts")]
    RowCountMismatch {
        /// Number of file identifiers
        files: usize,
        /// Number of per-file row counts
        row_counts: usize,
    },

    /// A dataset must carry at least one mass channel
    #[error("Dataset has no mass channels")]
    NoMassChannels,

    /// A file identifier was empty
    #[error("Empty file identifier at position {0}")]
    EmptyFileId(usize),

    /// Unrecognised on-disk sample encoding tag
    #[error("Unknown sample data type: {0}")]
    UnknownEncoding(String),

    /// Pixel count does not fit the platform's address space
    #[error("Total pixel count overflows")]
    PixelCountOverflow,
}
