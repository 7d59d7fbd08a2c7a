use super::ExecutionObserver;
use crate::{ExecutionState, ExecutionStatus, NodeId, RunId, RunOutcome, RunSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events published during workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        run_id: RunId,
        timestamp: DateTime<Utc>,
    },
    NodeStateChanged {
        run_id: RunId,
        node_id: NodeId,
        status: ExecutionStatus,
        error: Option<String>,
        duration_ms: Option<u64>,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        outcome: RunOutcome,
        executed: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast channel of execution events, usable as an observer
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}

impl ExecutionObserver for EventBus {
    fn on_run_started(&self, run_id: RunId) {
        self.emit(ExecutionEvent::RunStarted {
            run_id,
            timestamp: Utc::now(),
        });
    }

    fn on_node_state_change(&self, run_id: RunId, node_id: &str, state: &ExecutionState) {
        self.emit(ExecutionEvent::NodeStateChanged {
            run_id,
            node_id: node_id.to_string(),
            status: state.status,
            error: state.error.clone(),
            duration_ms: state.duration().map(|d| d.as_millis() as u64),
            timestamp: Utc::now(),
        });
    }

    fn on_execution_complete(&self, summary: &RunSummary) {
        self.emit(ExecutionEvent::RunCompleted {
            run_id: summary.run_id,
            outcome: summary.outcome.clone(),
            executed: summary.executed,
            duration_ms: summary.duration.as_millis() as u64,
            timestamp: Utc::now(),
        });
    }
}
