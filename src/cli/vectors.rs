//! Plain-text numeric vectors (mass axis, reference spectrum).

use anyhow::{Context, Result};
use std::path::Path;

/// Read whitespace or comma separated numbers; `#` starts a comment
pub fn read_vector(path: &Path) -> Result<Vec<f64>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_vector(&content).with_context(|| format!("Invalid numeric vector in {}", path.display()))
}

pub fn parse_vector(content: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let data = line.split('#').next().unwrap_or_default();
        for token in data
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let value: f64 = token
                .parse()
                .with_context(|| format!("line {}: '{}' is not a number", line_no + 1, token))?;
            values.push(value);
        }
    }
    Ok(values)
}

/// Write one value per line
pub fn write_vector(path: &Path, values: &[f64]) -> Result<()> {
    let mut content = String::with_capacity(values.len() * 12);
    for value in values {
        content.push_str(&value.to_string());
        content.push('\n');
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
