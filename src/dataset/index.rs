/// Prefix-sum table mapping `(file, row)` to the run-wide pixel index.
///
/// `offsets[i]` is the global index of the first row of file `i`; the last
/// entry is the total pixel count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelIndex {
    offsets: Vec<usize>,
}

impl PixelIndex {
    /// Build the table from per-file row counts.
    ///
    /// Returns `None` if the total does not fit in `usize`.
    pub fn from_row_counts(rows_per_file: &[usize]) -> Option<Self> {
        let mut offsets = Vec::with_capacity(rows_per_file.len() + 1);
        let mut acc = 0usize;
        offsets.push(acc);
        for &rows in rows_per_file {
            acc = acc.checked_add(rows)?;
            offsets.push(acc);
        }
        Some(Self { offsets })
    }

    /// Number of files covered
    pub fn file_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of pixels
    pub fn total(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    /// Number of rows in `file`
    pub fn rows_in(&self, file: usize) -> Option<usize> {
        Some(self.offsets.get(file + 1)? - self.offsets[file])
    }

    /// Global index of the first row of `file`
    pub fn file_offset(&self, file: usize) -> Option<usize> {
        if file < self.file_count() {
            Some(self.offsets[file])
        } else {
            None
        }
    }

    /// Global pixel index of `row` within `file`
    pub fn global_index(&self, file: usize, row: usize) -> Option<usize> {
        if row < self.rows_in(file)? {
            Some(self.offsets[file] + row)
        } else {
            None
        }
    }

    /// Inverse of [`global_index`](Self::global_index)
    pub fn locate(&self, global: usize) -> Option<(usize, usize)> {
        if global >= self.total() {
            return None;
        }
        // First offset strictly greater than `global`, minus one, skips empty files.
        let file = self.offsets.partition_point(|&offset| offset <= global) - 1;
        Some((file, global - self.offsets[file]))
    }
}
