//! # msialign
//!
//! Command-line front end for full-image MSI spectral alignment.
//!
//! ## Usage
//!
//! ```bash
//! # Align a raw dataset, lags to TSV
//! msialign align --data-dir /data/msi --file run01.raw --file run02.raw \
//!     --rows 12000,9500 --mass mass.txt --reference ref.txt --data-type float \
//!     -t 8 --bilinear -o lags.tsv
//!
//! # Generate and align a synthetic dataset
//! msialign -v demo msialign_demo
//!
//! # Show the cube plan of a dataset
//! msialign info --rows 12000,9500 --channels 4096 --cube-memory-mb 32
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
