//! # Dataset description
//!
//! A dataset is an ordered list of acquisition files, each holding a number of
//! spectra ("rows") that share one mass axis. Every row gets a run-wide
//! *global pixel index*: the prefix sum of the preceding files' row counts plus
//! the row offset within its file. That index is the only key shared by the
//! cube loader, the worker threads and the result table.

mod descriptor;
mod encoding;
mod error;
mod index;

#[cfg(test)]
mod tests;

pub use descriptor::DatasetDescriptor;
pub use encoding::SampleEncoding;
pub use error::DatasetError;
pub use index::PixelIndex;
