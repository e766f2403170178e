use anyhow::Result;

use msialign::align::AlignmentConfig;
use msialign::dataset::{DatasetDescriptor, SampleEncoding};

/// Print how a dataset would be split into cubes and rounds
pub fn run(
    rows: Vec<usize>,
    channels: usize,
    data_type: &str,
    config: &AlignmentConfig,
) -> Result<()> {
    let encoding: SampleEncoding = data_type.parse()?;
    let file_ids = (0..rows.len()).map(|i| format!("file{i}")).collect();
    let descriptor = DatasetDescriptor::new("", file_ids, rows, channels, encoding)?;
    let plan = config.cube_plan(&descriptor);

    let rounds = (plan.len() + config.threads - 1) / config.threads;
    let cube_bytes = plan.max_rows() * channels * std::mem::size_of::<f64>();

    println!("msialign Dataset Plan");
    println!("=====================");
    println!("Files: {}", descriptor.file_count());
    println!("Total pixels: {}", descriptor.total_pixels());
    println!("Mass channels: {}", channels);
    println!(
        "Encoding: {} ({} bytes/sample, {} bytes/row on disk)",
        encoding,
        encoding.width(),
        descriptor.row_bytes()
    );
    println!();

    println!("Cubes:");
    println!("  Count: {}", plan.len());
    println!(
        "  Largest: {} rows ({:.2} MB in memory)",
        plan.max_rows(),
        cube_bytes as f64 / 1024.0 / 1024.0
    );
    println!("  Threads: {}", config.threads);
    println!("  Rounds: {}", rounds);
    println!(
        "  Peak cube memory: {:.2} MB",
        (cube_bytes * config.threads.min(plan.len().max(1))) as f64 / 1024.0 / 1024.0
    );
    println!();

    println!("Files:");
    for (file, &file_rows) in descriptor.rows_per_file().iter().enumerate() {
        let first = descriptor.pixel_index().file_offset(file).unwrap_or(0);
        let cubes = plan.spans().iter().filter(|span| span.file == file).count();
        println!(
            "  {:3}. rows {:>8}  first pixel {:>10}  cubes {:>6}",
            file + 1,
            file_rows,
            first,
            cubes
        );
    }

    Ok(())
}
