use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use msialign::align::AlignmentConfig;

mod align;
mod config;
mod demo;
mod info;
mod vectors;

/// msialign - Streaming mass-axis alignment for MSI datasets
#[derive(Parser)]
#[command(name = "msialign")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Alignment parameters shared by `align` and `demo`.
///
/// Every flag is optional; unset flags fall back to the config file, then
/// to the built-in defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct AlignmentArgs {
    /// Worker threads (defaults to available parallelism)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Estimate separate low and high segment lags
    #[arg(long)]
    bilinear: bool,

    /// Refinement passes per spectrum
    #[arg(long)]
    iterations: Option<usize>,

    /// Largest accepted shift in ppm
    #[arg(long)]
    max_shift_ppm: Option<f64>,

    /// Correlation oversampling factor
    #[arg(long)]
    oversampling: Option<usize>,

    /// Start of the low segment (fraction of the mass axis)
    #[arg(long)]
    ref_low: Option<f64>,

    /// Boundary between the low and high segments
    #[arg(long)]
    ref_mid: Option<f64>,

    /// End of the high segment
    #[arg(long)]
    ref_high: Option<f64>,

    /// Memory budget of one cube in MiB
    #[arg(long)]
    cube_memory_mb: Option<usize>,

    /// Fixed cube height in rows (overrides --cube-memory-mb)
    #[arg(long, hide = true)]
    cube_rows: Option<usize>,

    /// Write corrected spectra back into the raw files
    #[arg(long)]
    correct: bool,
}

impl AlignmentArgs {
    /// Apply the flags that were given on top of `config`
    pub fn apply(&self, config: &mut AlignmentConfig) {
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.bilinear {
            config.bilinear = true;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(ppm) = self.max_shift_ppm {
            config.max_shift_ppm = ppm;
        }
        if let Some(oversampling) = self.oversampling {
            config.oversampling = oversampling;
        }
        if let Some(low) = self.ref_low {
            config.ref_low = low;
        }
        if let Some(mid) = self.ref_mid {
            config.ref_mid = mid;
        }
        if let Some(high) = self.ref_high {
            config.ref_high = high;
        }
        if let Some(mb) = self.cube_memory_mb {
            config.cube_memory_mb = mb;
        }
        if let Some(rows) = self.cube_rows {
            config.cube_rows = Some(rows);
        }
        if self.correct {
            config.correct_spectra = true;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Align every pixel of a multi-file raw MSI dataset
    Align {
        /// Directory holding the raw files
        #[arg(long, value_name = "DIR")]
        data_dir: PathBuf,

        /// Raw file names, in acquisition order
        #[arg(long = "file", value_name = "NAME", required = true, num_args = 1..)]
        files: Vec<String>,

        /// Rows per file, comma separated, same order as --file
        #[arg(long, value_name = "N,...", value_delimiter = ',', required = true)]
        rows: Vec<usize>,

        /// Text file with the mass axis (one value per channel)
        #[arg(long, value_name = "FILE")]
        mass: PathBuf,

        /// Text file with the reference intensities
        #[arg(long, value_name = "FILE")]
        reference: PathBuf,

        /// Sample type of the raw files (short, integer, float, double)
        #[arg(long, default_value = "float")]
        data_type: String,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output file (.tsv or .json); TSV to stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        alignment: AlignmentArgs,
    },

    /// Write a synthetic shifted dataset and align it
    Demo {
        /// Output directory
        #[arg(value_name = "OUTDIR", default_value = "msialign_demo")]
        output: PathBuf,

        /// Number of raw files
        #[arg(long, default_value = "3")]
        files: usize,

        /// Rows per file
        #[arg(long, default_value = "200")]
        rows: usize,

        /// Mass channels per spectrum
        #[arg(long, default_value = "2048")]
        channels: usize,

        /// Largest synthetic shift in channels
        #[arg(long, default_value = "2.0")]
        shift_channels: f64,

        #[command(flatten)]
        alignment: AlignmentArgs,
    },

    /// Show how a dataset would be split into cubes
    Info {
        /// Rows per file, comma separated
        #[arg(long, value_name = "N,...", value_delimiter = ',', required = true)]
        rows: Vec<usize>,

        /// Mass channels per spectrum
        #[arg(long)]
        channels: usize,

        /// Sample type of the raw files
        #[arg(long, default_value = "float")]
        data_type: String,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[command(flatten)]
        alignment: AlignmentArgs,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Build the run configuration: defaults, then the config file, then flags
pub fn resolve_config(
    file: Option<&PathBuf>,
    flags: &AlignmentArgs,
) -> Result<AlignmentConfig> {
    let mut config = AlignmentConfig::default();
    if let Some(path) = file {
        config::Config::from_file(path)?.alignment.apply(&mut config);
    }
    flags.apply(&mut config);
    config.validate()?;
    Ok(config)
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Align {
            data_dir,
            files,
            rows,
            mass,
            reference,
            data_type,
            config,
            output,
            alignment,
        } => {
            let config = resolve_config(config.as_ref(), &alignment)?;
            align::run(align::AlignInputs {
                data_dir,
                files,
                rows,
                mass,
                reference,
                data_type,
                output,
                config,
            })
        }
        Commands::Demo {
            output,
            files,
            rows,
            channels,
            shift_channels,
            alignment,
        } => {
            let config = resolve_config(None, &alignment)?;
            demo::run(output, files, rows, channels, shift_channels, config)
        }
        Commands::Info {
            rows,
            channels,
            data_type,
            config,
            alignment,
        } => {
            let config = resolve_config(config.as_ref(), &alignment)?;
            info::run(rows, channels, &data_type, &config)
        }
    }
}
