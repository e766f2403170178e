//! TOML configuration file support.
//!
//! Instead of passing many CLI flags, alignment settings can be kept in a file:
//!
//! ```toml
//! # msialign.toml
//! [alignment]
//! threads = 16
//! bilinear = true
//! iterations = 4
//! max_shift_ppm = 100.0
//! cube_memory_mb = 256
//! ```
//!
//! Flags given on the command line take precedence over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use msialign::align::AlignmentConfig;

/// Root configuration structure for msialign.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Alignment settings.
    #[serde(default)]
    pub alignment: AlignmentOverrides,
}

/// Optional overrides of [`AlignmentConfig`] fields.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlignmentOverrides {
    pub threads: Option<usize>,
    pub iterations: Option<usize>,
    pub oversampling: Option<usize>,
    pub bilinear: Option<bool>,
    pub ref_low: Option<f64>,
    pub ref_mid: Option<f64>,
    pub ref_high: Option<f64>,
    pub max_shift_ppm: Option<f64>,
    pub cube_memory_mb: Option<usize>,
    pub cube_rows: Option<usize>,
    pub correct_spectra: Option<bool>,
}

impl AlignmentOverrides {
    /// Copy every value present in the file into `config`
    pub fn apply(&self, config: &mut AlignmentConfig) {
        fn set<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }
        set(&mut config.threads, self.threads);
        set(&mut config.iterations, self.iterations);
        set(&mut config.oversampling, self.oversampling);
        set(&mut config.bilinear, self.bilinear);
        set(&mut config.ref_low, self.ref_low);
        set(&mut config.ref_mid, self.ref_mid);
        set(&mut config.ref_high, self.ref_high);
        set(&mut config.max_shift_ppm, self.max_shift_ppm);
        set(&mut config.cube_memory_mb, self.cube_memory_mb);
        set(&mut config.correct_spectra, self.correct_spectra);
        if self.cube_rows.is_some() {
            config.cube_rows = self.cube_rows;
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [alignment]
            threads = 16
            bilinear = true
            iterations = 4
            max_shift_ppm = 100.0
            ref_mid = 0.4
            cube_memory_mb = 256
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.alignment.threads, Some(16));
        assert_eq!(config.alignment.bilinear, Some(true));
        assert_eq!(config.alignment.max_shift_ppm, Some(100.0));
        assert_eq!(config.alignment.oversampling, None);

        let mut resolved = AlignmentConfig::default();
        config.alignment.apply(&mut resolved);
        assert_eq!(resolved.threads, 16);
        assert_eq!(resolved.iterations, 4);
        assert_eq!(resolved.ref_mid, 0.4);
        assert_eq!(resolved.cube_memory_mb, 256);
        assert_eq!(resolved.oversampling, 2);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.alignment.threads, None);

        let mut resolved = AlignmentConfig::default();
        config.alignment.apply(&mut resolved);
        assert_eq!(resolved, AlignmentConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let toml = r#"
            [alignment]
            max_shift = 10
        "#;
        assert!(Config::from_str(toml).is_err());
    }
}
