use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub inputs: InputConfig,
    pub outputs: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

/// Raw, headerless trace files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub machine_events: PathBuf,
    pub batch_tasks: PathBuf,
    pub batch_instances: PathBuf,
}

/// Artifacts read by the downstream simulator, plus the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub machine_events: PathBuf,
    pub batch_instances: PathBuf,
    pub report: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_progress_interval_rows")]
    pub progress_interval_rows: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            progress_interval_rows: default_progress_interval_rows(),
        }
    }
}

fn default_parallel() -> bool {
    true
}

fn default_progress_interval_rows() -> u64 {
    1_000_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_summary_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_values_per_column")]
    pub max_values_per_column: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: default_summary_enabled(),
            max_values_per_column: default_max_values_per_column(),
        }
    }
}

fn default_summary_enabled() -> bool {
    true
}

fn default_max_values_per_column() -> usize {
    64_000_000
}
