use crate::{NodeId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub type RunId = Uuid;

/// Lifecycle of a node within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::Error | ExecutionStatus::Skipped
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A message a node wrote through its context logger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-node record of a single run.
///
/// `started_at` / `ended_at` come from the monotonic clock and are only
/// meaningful relative to each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionState {
    pub status: ExecutionStatus,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
    pub inputs: HashMap<String, Value>,
    pub outputs: HashMap<String, Value>,
    pub error: Option<String>,
    pub logs: Vec<LogEntry>,
}

impl ExecutionState {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every node in the order ran successfully.
    Finished,
    /// A node failed; nothing after it was attempted.
    Halted { node_id: NodeId },
    /// `stop()` was requested; `before` is the first node not started.
    Stopped { before: NodeId },
    /// Scheduling failed and no node ran.
    Aborted { reason: String },
}

/// Passed to observers once a run is over
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    pub executed: usize,
    pub duration: Duration,
}
