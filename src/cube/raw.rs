use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::dataset::{DatasetDescriptor, SampleEncoding};

use super::error::CubeError;
use super::source::CubeSource;
use super::types::{Cube, CubeSpan};

/// Cube source reading one raw row-major sample matrix per dataset file.
///
/// File `i` is `descriptor.file_path(i)` and holds
/// `rows_per_file[i] * mass_channels` little-endian samples of the
/// descriptor's encoding, without header.
pub struct RawFileSource {
    descriptor: DatasetDescriptor,
    handles: Vec<Option<File>>,
    writable: bool,
    bytes: Vec<u8>,
}

impl RawFileSource {
    /// Open the dataset for reading only
    pub fn open(descriptor: DatasetDescriptor) -> Self {
        Self::with_mode(descriptor, false)
    }

    /// Open the dataset for reading and writing back corrected spectra
    pub fn open_writable(descriptor: DatasetDescriptor) -> Self {
        Self::with_mode(descriptor, true)
    }

    fn with_mode(descriptor: DatasetDescriptor, writable: bool) -> Self {
        let handles = (0..descriptor.file_count()).map(|_| None).collect();
        Self {
            descriptor,
            handles,
            writable,
            bytes: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &DatasetDescriptor {
        &self.descriptor
    }

    /// Check that every file exists and is large enough
    pub fn verify(&self) -> Result<(), CubeError> {
        for (file, &rows) in self.descriptor.rows_per_file().iter().enumerate() {
            let path = self.path(file)?;
            let len = std::fs::metadata(&path)
                .map_err(|source| CubeError::Io {
                    path: path.clone(),
                    source,
                })?
                .len();
            let expected = (rows * self.descriptor.row_bytes()) as u64;
            if len < expected {
                return Err(CubeError::InvalidData(format!(
                    "{} holds {len} bytes, expected at least {expected}",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    fn path(&self, file: usize) -> Result<PathBuf, CubeError> {
        self.descriptor
            .file_path(file)
            .ok_or(CubeError::OutOfRange {
                file,
                first_row: 0,
                end_row: 0,
            })
    }

    fn check_span(&self, span: &CubeSpan) -> Result<(), CubeError> {
        match self.descriptor.rows_per_file().get(span.file) {
            Some(&rows) if span.end_row() <= rows => Ok(()),
            _ => Err(CubeError::OutOfRange {
                file: span.file,
                first_row: span.first_row,
                end_row: span.end_row(),
            }),
        }
    }

    /// Open (or reuse) the handle of `file`, positioned at `row`
    fn seek_to(&mut self, file: usize, row: usize) -> Result<&mut File, CubeError> {
        let path = self.path(file)?;
        let io_err = |source| CubeError::Io {
            path: path.clone(),
            source,
        };

        if self.handles[file].is_none() {
            debug!("Opening {}", path.display());
            let handle = OpenOptions::new()
                .read(true)
                .write(self.writable)
                .open(&path)
                .map_err(io_err)?;
            self.handles[file] = Some(handle);
        }

        let offset = (row * self.descriptor.row_bytes()) as u64;
        let handle = self.handles[file]
            .as_mut()
            .ok_or_else(|| CubeError::InvalidData("file handle missing".to_string()))?;
        handle.seek(SeekFrom::Start(offset)).map_err(io_err)?;
        Ok(handle)
    }
}

impl CubeSource for RawFileSource {
    fn channels(&self) -> usize {
        self.descriptor.mass_channels()
    }

    fn load_cube(&mut self, span: &CubeSpan) -> Result<Cube, CubeError> {
        self.check_span(span)?;
        let channels = self.descriptor.mass_channels();
        let encoding = self.descriptor.encoding();
        let byte_len = span.rows * self.descriptor.row_bytes();

        let mut bytes = std::mem::take(&mut self.bytes);
        bytes.resize(byte_len, 0);
        let path = self.path(span.file)?;
        let handle = self.seek_to(span.file, span.first_row)?;
        handle
            .read_exact(&mut bytes)
            .map_err(|source| CubeError::Io { path, source })?;

        let mut data = vec![0.0; span.rows * channels];
        encoding.decode_into(&bytes, &mut data);
        self.bytes = bytes;

        Cube::new(*span, channels, data)
            .ok_or_else(|| CubeError::InvalidData("cube size mismatch".to_string()))
    }

    fn store_cube(&mut self, cube: &Cube) -> Result<(), CubeError> {
        if !self.writable {
            return Err(CubeError::ReadOnly);
        }
        let span = *cube.span();
        self.check_span(&span)?;
        if cube.channels() != self.descriptor.mass_channels() {
            return Err(CubeError::InvalidData(format!(
                "cube has {} channels, dataset has {}",
                cube.channels(),
                self.descriptor.mass_channels()
            )));
        }

        let mut bytes = std::mem::take(&mut self.bytes);
        self.descriptor.encoding().encode_into(cube.data(), &mut bytes);
        let path = self.path(span.file)?;
        let handle = self.seek_to(span.file, span.first_row)?;
        handle
            .write_all(&bytes)
            .and_then(|_| handle.flush())
            .map_err(|source| CubeError::Io { path, source })?;
        self.bytes = bytes;
        Ok(())
    }
}

/// Write `rows` as a raw sample matrix at `path`
pub fn write_raw_file<'a, I>(path: &Path, encoding: SampleEncoding, rows: I) -> Result<(), CubeError>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let io_err = |source| CubeError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    let mut bytes = Vec::new();
    for row in rows {
        encoding.encode_into(row, &mut bytes);
        writer.write_all(&bytes).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}
