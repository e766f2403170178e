//! # Cube streaming
//!
//! Datasets are read in *cubes*: bounded blocks of contiguous rows from one
//! file. [`CubePlan`] fixes the enumeration order up front and
//! [`CubeSource`] implementations turn a [`CubeSpan`] into rows of `f64`
//! samples. Two sources are provided:
//!
//! - [`InMemorySource`] for spectra already in memory
//! - [`RawFileSource`] for raw little-endian sample matrices on disk

mod error;
mod memory;
mod plan;
mod raw;
mod source;
mod types;


pub use error::CubeError;
pub use memory::InMemorySource;
pub use plan::{rows_for_budget, CubePlan};
pub use raw::{write_raw_file, RawFileSource};
pub use source::CubeSource;
pub use types::{Cube, CubeSpan};
