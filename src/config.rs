//! Pipeline configuration
//!
//! Tunables for a pipeline deployment: queue bounds, the source
//! backpressure poll interval, profiling and per-stage CPU placement.
//! Configs serialize to TOML so deployments can be versioned alongside
//! model files.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default cap on a source's output queue length.
pub const DEFAULT_MAX_QUEUE_LEN: usize = 1024;

/// Default source backpressure poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Placement and naming for one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage instance name (thread name, log and event tag).
    pub name: String,

    /// CPU core to pin the stage thread to. `None` means unpinned.
    #[serde(default)]
    pub cpu_core: Option<usize>,
}

/// Top-level pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum source output queue length before backpressure kicks in.
    pub max_queue_len: usize,

    /// How long a source sleeps between backpressure polls, in ms.
    pub source_poll_interval_ms: u64,

    /// Whether stages record per-item latency profiles.
    pub enable_profiling: bool,

    /// Per-stage placement, in pipeline order.
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_queue_len: DEFAULT_MAX_QUEUE_LEN,
            source_poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            enable_profiling: false,
            stages: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Save the config as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text =
            toml::to_string_pretty(self).map_err(|e| PipelineError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// The source poll interval as a [`Duration`].
    pub fn source_poll_interval(&self) -> Duration {
        Duration::from_millis(self.source_poll_interval_ms)
    }

    /// Look up a stage's config by name.
    pub fn stage(&self, name: &str) -> Option<&StageConfig> {
        self.stages.iter().find(|s| s.name == name)
    }
}
