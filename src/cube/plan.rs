use crate::dataset::DatasetDescriptor;

use super::types::CubeSpan;

/// Fixed enumeration of all cubes in a dataset.
///
/// Cubes follow file order, then row order, and never cross a file boundary.
/// The order is decided once here and never changed at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubePlan {
    spans: Vec<CubeSpan>,
    total_pixels: usize,
}

impl CubePlan {
    /// Split every file into cubes of at most `rows_per_cube` rows
    pub fn new(rows_per_file: &[usize], rows_per_cube: usize) -> Self {
        let rows_per_cube = rows_per_cube.max(1);
        let mut spans = Vec::new();
        let mut first_pixel = 0usize;

        for (file, &rows) in rows_per_file.iter().enumerate() {
            let mut first_row = 0;
            while first_row < rows {
                let n = rows_per_cube.min(rows - first_row);
                spans.push(CubeSpan {
                    index: spans.len(),
                    file,
                    first_row,
                    rows: n,
                    first_pixel: first_pixel + first_row,
                });
                first_row += n;
            }
            first_pixel += rows;
        }

        Self {
            spans,
            total_pixels: first_pixel,
        }
    }

    /// Plan for `descriptor`, sizing cubes to roughly `cube_memory_bytes`
    pub fn for_descriptor(descriptor: &DatasetDescriptor, cube_memory_bytes: usize) -> Self {
        let rows = rows_for_budget(cube_memory_bytes, descriptor.mass_channels());
        Self::new(descriptor.rows_per_file(), rows)
    }

    pub fn spans(&self) -> &[CubeSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn total_pixels(&self) -> usize {
        self.total_pixels
    }

    /// Global pixel index of the first row of every cube
    pub fn cube_first_row_id(&self) -> impl Iterator<Item = usize> + '_ {
        self.spans.iter().map(|span| span.first_pixel)
    }

    /// Largest cube in rows
    pub fn max_rows(&self) -> usize {
        self.spans.iter().map(|span| span.rows).max().unwrap_or(0)
    }
}

/// Rows that fit `budget_bytes` when held as `f64` (at least one)
pub fn rows_for_budget(budget_bytes: usize, channels: usize) -> usize {
    let row_bytes = channels.max(1) * std::mem::size_of::<f64>();
    (budget_bytes / row_bytes).max(1)
}
