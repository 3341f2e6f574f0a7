//! Configuration management for the CLI

use crate::output::OutputFormat;
use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use evalstore::EstimatorKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI defaults read from `~/.config/evalstore/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default estimator kind
    pub default_kind: Option<String>,
    /// Default output format
    pub default_format: Option<String>,
    /// Reject zero or negative timings unless overridden on the command line
    pub strict_zero_timing: Option<bool>,
}

impl Config {
    /// Load configuration from file, or defaults if there is none
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Configured estimator kind, classification if unset
    pub fn kind(&self) -> Result<EstimatorKind> {
        match self.default_kind.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("classification") => Ok(EstimatorKind::Classification),
            Some("clustering") => Ok(EstimatorKind::Clustering),
            Some("regression") => Ok(EstimatorKind::Regression),
            Some(other) => Err(anyhow!("Unknown default_kind '{}' in config file", other)),
        }
    }

    /// Configured output format, table if unset
    pub fn format(&self) -> Result<OutputFormat> {
        match &self.default_format {
            None => Ok(OutputFormat::default()),
            Some(name) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow!("Invalid default_format in config file: {}", e)),
        }
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("evalstore").join("config.json"))
    }
}
