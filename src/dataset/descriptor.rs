use std::path::{Path, PathBuf};

use super::encoding::SampleEncoding;
use super::error::DatasetError;
use super::index::PixelIndex;

/// Immutable description of a multi-file MSI dataset.
///
/// Each file holds `rows_per_file[i]` spectra of `mass_channels` samples.
#[derive(Debug, Clone)]
pub struct DatasetDescriptor {
    base_path: PathBuf,
    file_ids: Vec<String>,
    rows_per_file: Vec<usize>,
    mass_channels: usize,
    encoding: SampleEncoding,
    index: PixelIndex,
}

impl DatasetDescriptor {
    /// Validate and build a descriptor
    pub fn new<P: Into<PathBuf>>(
        base_path: P,
        file_ids: Vec<String>,
        rows_per_file: Vec<usize>,
        mass_channels: usize,
        encoding: SampleEncoding,
    ) -> Result<Self, DatasetError> {
        if file_ids.len() != rows_per_file.len() {
            return Err(DatasetError::RowCountMismatch {
                files: file_ids.len(),
                row_counts: rows_per_file.len(),
            });
        }
        if mass_channels == 0 {
            return Err(DatasetError::NoMassChannels);
        }
        if let Some(pos) = file_ids.iter().position(|id| id.is_empty()) {
            return Err(DatasetError::EmptyFileId(pos));
        }
        let index =
            PixelIndex::from_row_counts(&rows_per_file).ok_or(DatasetError::PixelCountOverflow)?;

        Ok(Self {
            base_path: base_path.into(),
            file_ids,
            rows_per_file,
            mass_channels,
            encoding,
            index,
        })
    }

    /// Descriptor for data that lives only in memory (no base path)
    pub fn in_memory(rows_per_file: Vec<usize>, mass_channels: usize) -> Result<Self, DatasetError> {
        let file_ids = (0..rows_per_file.len()).map(|i| format!("mem{i}")).collect();
        Self::new(
            PathBuf::new(),
            file_ids,
            rows_per_file,
            mass_channels,
            SampleEncoding::Float64,
        )
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn file_ids(&self) -> &[String] {
        &self.file_ids
    }

    pub fn rows_per_file(&self) -> &[usize] {
        &self.rows_per_file
    }

    pub fn mass_channels(&self) -> usize {
        self.mass_channels
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    pub fn file_count(&self) -> usize {
        self.file_ids.len()
    }

    /// Sum of per-file row counts
    pub fn total_pixels(&self) -> usize {
        self.index.total()
    }

    /// Prefix-sum pixel index for this dataset
    pub fn pixel_index(&self) -> &PixelIndex {
        &self.index
    }

    /// Location of the raw sample file for `file`
    pub fn file_path(&self, file: usize) -> Option<PathBuf> {
        self.file_ids.get(file).map(|id| self.base_path.join(id))
    }

    /// Size in bytes of one spectrum on disk
    pub fn row_bytes(&self) -> usize {
        self.mass_channels * self.encoding.width()
    }
}
