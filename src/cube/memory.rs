use super::error::CubeError;
use super::source::CubeSource;
use super::types::{Cube, CubeSpan};

/// Cube source over spectra already held in memory, one matrix per file.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    channels: usize,
    files: Vec<Vec<f64>>,
}

impl InMemorySource {
    /// Build from per-file lists of spectra
    pub fn from_rows(channels: usize, files: Vec<Vec<Vec<f64>>>) -> Result<Self, CubeError> {
        let mut flat = Vec::with_capacity(files.len());
        for (file, rows) in files.into_iter().enumerate() {
            let mut data = Vec::with_capacity(rows.len() * channels);
            for (row, spectrum) in rows.into_iter().enumerate() {
                if spectrum.len() != channels {
                    return Err(CubeError::InvalidData(format!(
                        "file {file} row {row} has {} samples, expected {channels}",
                        spectrum.len()
                    )));
                }
                data.extend(spectrum);
            }
            flat.push(data);
        }
        Ok(Self {
            channels,
            files: flat,
        })
    }

    /// Row counts per file
    pub fn rows_per_file(&self) -> Vec<usize> {
        self.files
            .iter()
            .map(|data| data.len() / self.channels.max(1))
            .collect()
    }

    /// One spectrum, if present
    pub fn row(&self, file: usize, row: usize) -> Option<&[f64]> {
        let start = row.checked_mul(self.channels)?;
        self.files.get(file)?.get(start..start + self.channels)
    }

    fn range(&self, span: &CubeSpan) -> Result<std::ops::Range<usize>, CubeError> {
        let out_of_range = || CubeError::OutOfRange {
            file: span.file,
            first_row: span.first_row,
            end_row: span.end_row(),
        };
        let data = self.files.get(span.file).ok_or_else(out_of_range)?;
        let range = span.first_row * self.channels..span.end_row() * self.channels;
        if range.end > data.len() {
            return Err(out_of_range());
        }
        Ok(range)
    }
}

impl CubeSource for InMemorySource {
    fn channels(&self) -> usize {
        self.channels
    }

    fn load_cube(&mut self, span: &CubeSpan) -> Result<Cube, CubeError> {
        let range = self.range(span)?;
        let data = self.files[span.file][range].to_vec();
        Cube::new(*span, self.channels, data)
            .ok_or_else(|| CubeError::InvalidData("cube size mismatch".to_string()))
    }

    fn store_cube(&mut self, cube: &Cube) -> Result<(), CubeError> {
        if cube.channels() != self.channels {
            return Err(CubeError::InvalidData(format!(
                "cube has {} channels, source has {}",
                cube.channels(),
                self.channels
            )));
        }
        let range = self.range(cube.span())?;
        self.files[cube.span().file][range].copy_from_slice(cube.data());
        Ok(())
    }
}
