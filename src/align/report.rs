use std::io::Write;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::ProcessingError;

use super::config::AlignmentConfig;
use super::error::AlignmentError;
use super::lags::LagPair;

/// Cell states of a [`LagTable`]
const EMPTY: u8 = 0;
const CLAIMED: u8 = 1;
const WRITTEN: u8 = 2;

/// Per-pixel result table shared by all worker slots.
///
/// Every global pixel index owns one cell, written exactly once, so slots
/// store without locking. Values are kept as `f64` bit patterns. A cell is
/// claimed before its values are stored and only reads as written once both
/// values are published.
#[derive(Debug)]
pub struct LagTable {
    low: Vec<AtomicU64>,
    high: Vec<AtomicU64>,
    state: Vec<AtomicU8>,
}

fn try_cells<T>(len: usize, make: impl Fn() -> T) -> Result<Vec<T>, AlignmentError> {
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(len)
        .map_err(|_| AlignmentError::Allocation { pixels: len })?;
    cells.extend((0..len).map(|_| make()));
    Ok(cells)
}

impl LagTable {
    /// Allocate a table for `pixels` pixels
    pub fn new(pixels: usize) -> Result<Self, AlignmentError> {
        Ok(Self {
            low: try_cells(pixels, || AtomicU64::new(0))?,
            high: try_cells(pixels, || AtomicU64::new(0))?,
            state: try_cells(pixels, || AtomicU8::new(EMPTY))?,
        })
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Record the lags of `pixel`; a second write is an error
    pub fn store(&self, pixel: usize, lags: LagPair) -> Result<(), ProcessingError> {
        let state = self
            .state
            .get(pixel)
            .ok_or(ProcessingError::PixelOutOfRange {
                pixel,
                total: self.len(),
            })?;
        state
            .compare_exchange(EMPTY, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ProcessingError::DuplicatePixel(pixel))?;
        self.low[pixel].store(lags.low.to_bits(), Ordering::Relaxed);
        self.high[pixel].store(lags.high.to_bits(), Ordering::Relaxed);
        state.store(WRITTEN, Ordering::Release);
        Ok(())
    }

    fn is_written(&self, pixel: usize) -> bool {
        self.state[pixel].load(Ordering::Acquire) == WRITTEN
    }

    /// Lags of `pixel` once fully written
    pub fn get(&self, pixel: usize) -> Option<LagPair> {
        if pixel >= self.len() || !self.is_written(pixel) {
            return None;
        }
        Some(LagPair::new(
            f64::from_bits(self.low[pixel].load(Ordering::Relaxed)),
            f64::from_bits(self.high[pixel].load(Ordering::Relaxed)),
        ))
    }

    pub fn written_count(&self) -> usize {
        (0..self.len()).filter(|&pixel| self.is_written(pixel)).count()
    }

    /// Complete report, or the partial one if any pixel is missing
    pub fn into_report(self) -> Result<LagReport, PartialLagReport> {
        if self.written_count() != self.len() {
            return Err(self.into_partial());
        }
        Ok(LagReport {
            lag_low: self.low.into_iter().map(|v| f64::from_bits(v.into_inner())).collect(),
            lag_high: self.high.into_iter().map(|v| f64::from_bits(v.into_inner())).collect(),
        })
    }

    /// Snapshot of the written cells
    pub fn into_partial(self) -> PartialLagReport {
        let written: Vec<bool> = self
            .state
            .into_iter()
            .map(|state| state.into_inner() == WRITTEN)
            .collect();
        let column = |cells: Vec<AtomicU64>| -> Vec<Option<f64>> {
            cells
                .into_iter()
                .zip(&written)
                .map(|(cell, &done)| done.then(|| f64::from_bits(cell.into_inner())))
                .collect()
        };
        PartialLagReport {
            lag_low: column(self.low),
            lag_high: column(self.high),
        }
    }
}

/// Lags of every pixel in global pixel order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LagReport {
    pub lag_low: Vec<f64>,
    pub lag_high: Vec<f64>,
}

impl LagReport {
    pub fn len(&self) -> usize {
        self.lag_low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lag_low.is_empty()
    }

    pub fn get(&self, pixel: usize) -> Option<LagPair> {
        Some(LagPair::new(
            *self.lag_low.get(pixel)?,
            *self.lag_high.get(pixel)?,
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = LagPair> + '_ {
        self.lag_low
            .iter()
            .zip(&self.lag_high)
            .map(|(&low, &high)| LagPair::new(low, high))
    }

    /// Largest absolute lag in the report
    pub fn max_abs(&self) -> f64 {
        self.iter().map(|lags| lags.max_abs()).fold(0.0, f64::max)
    }

    /// Write `pixel lag_low lag_high` rows as tab-separated text
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        out.write_record(["pixel", "lag_low", "lag_high"])?;
        for (pixel, lags) in self.iter().enumerate() {
            out.write_record([
                pixel.to_string(),
                lags.low.to_string(),
                lags.high.to_string(),
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    /// JSON envelope with run metadata
    pub fn to_document<'a>(&'a self, config: &'a AlignmentConfig) -> LagReportDocument<'a> {
        LagReportDocument {
            created: Utc::now(),
            software: concat!("msialign ", env!("CARGO_PKG_VERSION")),
            total_pixels: self.len(),
            config,
            lag_low: &self.lag_low,
            lag_high: &self.lag_high,
        }
    }
}

/// Lags written before a run failed; `None` marks unwritten pixels
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartialLagReport {
    pub lag_low: Vec<Option<f64>>,
    pub lag_high: Vec<Option<f64>>,
}

impl PartialLagReport {
    /// Total pixel count of the run
    pub fn len(&self) -> usize {
        self.lag_low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lag_low.is_empty()
    }

    pub fn written_count(&self) -> usize {
        self.lag_low.iter().filter(|v| v.is_some()).count()
    }

    pub fn get(&self, pixel: usize) -> Option<LagPair> {
        Some(LagPair::new(
            (*self.lag_low.get(pixel)?)?,
            (*self.lag_high.get(pixel)?)?,
        ))
    }
}

/// Serialized form of a finished run
#[derive(Debug, Serialize)]
pub struct LagReportDocument<'a> {
    pub created: DateTime<Utc>,
    pub software: &'static str,
    pub total_pixels: usize,
    pub config: &'a AlignmentConfig,
    pub lag_low: &'a [f64],
    pub lag_high: &'a [f64],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claimed_cell_is_not_visible() {
        let table = LagTable::new(2).unwrap();
        table.state[0].store(CLAIMED, Ordering::Release);

        assert_eq!(table.get(0), None);
        assert_eq!(table.written_count(), 0);
        assert!(matches!(
            table.store(0, LagPair::uniform(1.0)),
            Err(ProcessingError::DuplicatePixel(0))
        ));

        table.store(1, LagPair::new(0.5, -0.5)).unwrap();
        assert_eq!(table.get(1), Some(LagPair::new(0.5, -0.5)));
        let partial = table.into_partial();
        assert_eq!(partial.lag_low, vec![None, Some(0.5)]);
    }
}
