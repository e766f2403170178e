/// Location of one cube: a contiguous run of rows inside a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeSpan {
    /// Position of this cube in the enumeration order
    pub index: usize,
    /// Dataset file the rows come from
    pub file: usize,
    /// First row within the file
    pub first_row: usize,
    /// Number of rows
    pub rows: usize,
    /// Global pixel index of the first row
    pub first_pixel: usize,
}

impl CubeSpan {
    /// One past the last in-file row
    pub fn end_row(&self) -> usize {
        self.first_row + self.rows
    }

    /// Global pixel index of the cube's `row`-th row
    pub fn pixel_of(&self, row: usize) -> usize {
        self.first_pixel + row
    }
}

/// A block of spectra held in memory, stored row-major.
///
/// Owned by exactly one worker slot between load and release.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    span: CubeSpan,
    channels: usize,
    data: Vec<f64>,
}

impl Cube {
    /// Wrap `data` (`span.rows * channels` samples)
    pub fn new(span: CubeSpan, channels: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != span.rows * channels {
            return None;
        }
        Some(Self {
            span,
            channels,
            data,
        })
    }

    pub fn span(&self) -> &CubeSpan {
        &self.span
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn nrows(&self) -> usize {
        self.span.rows
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        let start = row.checked_mul(self.channels)?;
        self.data.get(start..start + self.channels)
    }

    /// Iterate `(global pixel, row)` pairs
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[f64])> {
        let first_pixel = self.span.first_pixel;
        self.data
            .chunks_exact(self.channels)
            .enumerate()
            .map(move |(i, row)| (first_pixel + i, row))
    }

    /// Iterate `(global pixel, row)` pairs mutably
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (usize, &mut [f64])> {
        let first_pixel = self.span.first_pixel;
        self.data
            .chunks_exact_mut(self.channels)
            .enumerate()
            .map(move |(i, row)| (first_pixel + i, row))
    }

    /// All samples, row-major
    pub fn data(&self) -> &[f64] {
        &self.data
    }
}
