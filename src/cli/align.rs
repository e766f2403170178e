use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use msialign::align::{full_image_align, AlignmentConfig, LagReport};

use super::vectors::read_vector;

/// Inputs of the `align` command
pub struct AlignInputs {
    pub data_dir: PathBuf,
    pub files: Vec<String>,
    pub rows: Vec<usize>,
    pub mass: PathBuf,
    pub reference: PathBuf,
    pub data_type: String,
    pub output: Option<PathBuf>,
    pub config: AlignmentConfig,
}

/// Align a raw dataset and write its lag report
pub fn run(inputs: AlignInputs) -> Result<()> {
    if !inputs.data_dir.is_dir() {
        anyhow::bail!("Data directory does not exist: {}", inputs.data_dir.display());
    }

    let mass = read_vector(&inputs.mass)?;
    let reference = read_vector(&inputs.reference)?;
    let config = &inputs.config;

    info!("msialign - full image alignment");
    info!("===============================");
    info!("Data directory: {}", inputs.data_dir.display());
    info!("Files: {}", inputs.files.len());
    info!("Pixels: {}", inputs.rows.iter().sum::<usize>());
    info!("Mass channels: {}", mass.len());
    info!("Threads: {}", config.threads);
    info!(
        "Mode: {}, {} iterations, {} ppm max shift, oversampling {}",
        if config.bilinear { "bilinear" } else { "single segment" },
        config.iterations,
        config.max_shift_ppm,
        config.oversampling
    );

    let report = full_image_align(
        &inputs.data_dir,
        &inputs.files,
        mass,
        reference,
        &inputs.rows,
        &inputs.data_type,
        config,
    )
    .context("Alignment failed")?;

    info!("Alignment complete!");
    info!("  Pixels aligned: {}", report.len());
    info!("  Largest lag: {:.3} channels", report.max_abs());

    write_report(&report, config, inputs.output.as_ref())
}

/// Write `report` as JSON or TSV depending on the output extension
pub fn write_report(
    report: &LagReport,
    config: &AlignmentConfig,
    output: Option<&PathBuf>,
) -> Result<()> {
    let Some(path) = output else {
        let stdout = std::io::stdout();
        return report
            .write_tsv(stdout.lock())
            .context("Failed to write lags to stdout");
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        serde_json::to_writer_pretty(&mut writer, &report.to_document(config))
            .context("Failed to write JSON report")?;
        writer.write_all(b"\n")?;
    } else {
        report
            .write_tsv(&mut writer)
            .context("Failed to write TSV report")?;
    }
    writer.flush()?;

    info!("Lags written to {}", path.display());
    Ok(())
}
