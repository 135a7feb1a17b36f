//! Pipeline configuration.
//!
//! Loaded from a YAML file; every field has a default so a partial (or
//! absent) config is fine.

use crate::telemetry::HumanTimeTable;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the pipeline runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding per-workflow event logs and snapshots.
    pub data_dir: PathBuf,
    /// Snapshot the aggregate after every N events (0 = disabled).
    pub snapshot_every: u64,
    /// Human-equivalent-time table for telemetry.
    pub time_table: HumanTimeTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/workflows"),
            snapshot_every: 50,
            time_table: HumanTimeTable::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults with a specific data directory. Convenient for tests and
    /// embedded use.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Self::default()
        }
    }
}
