use serde::Deserialize;
use std::path::Path;
use wirecore::FlowError;

/// Configuration for the runner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the broadcast channel behind `EventBus`
    pub event_buffer_size: usize,
    /// Record node log entries in their execution state
    pub capture_node_logs: bool,
    /// Entries kept per node per run; extra entries are dropped
    pub max_log_entries: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            capture_node_logs: true,
            max_log_entries: 500,
        }
    }
}

impl RuntimeConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FlowError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
