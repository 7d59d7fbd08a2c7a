use std::collections::HashMap;
use std::time::Instant;
use wirecore::{ExecutionState, ExecutionStatus, LogEntry, NodeId, StateError, Value};

/// Execution state of every node for the current run.
///
/// Enforces the per-run state machine: `pending -> running -> success|error`
/// or `pending -> skipped`. Nothing ever goes back to `running`.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStateStore {
    order: Vec<NodeId>,
    states: HashMap<NodeId, ExecutionState>,
}

impl ExecutionStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all previous state and mark every given node pending.
    pub fn reset(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.order.clear();
        self.states.clear();
        for id in ids {
            if self.states.insert(id.clone(), ExecutionState::pending()).is_none() {
                self.order.push(id);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&ExecutionState> {
        self.states.get(id)
    }

    pub fn status(&self, id: &str) -> Option<ExecutionStatus> {
        self.states.get(id).map(|s| s.status)
    }

    pub fn is_success(&self, id: &str) -> bool {
        self.status(id) == Some(ExecutionStatus::Success)
    }

    /// Output value of a node that completed successfully.
    pub fn output(&self, id: &str, port: &str) -> Option<&Value> {
        self.states
            .get(id)
            .filter(|s| s.status == ExecutionStatus::Success)
            .and_then(|s| s.outputs.get(port))
    }

    pub fn mark_running(
        &mut self,
        id: &str,
        inputs: HashMap<String, Value>,
    ) -> Result<ExecutionState, StateError> {
        let state = self.transition(id, ExecutionStatus::Pending, ExecutionStatus::Running)?;
        state.started_at = Some(Instant::now());
        state.inputs = inputs;
        Ok(state.clone())
    }

    pub fn mark_success(
        &mut self,
        id: &str,
        outputs: HashMap<String, Value>,
        logs: Vec<LogEntry>,
    ) -> Result<ExecutionState, StateError> {
        let state = self.transition(id, ExecutionStatus::Running, ExecutionStatus::Success)?;
        state.ended_at = Some(Instant::now());
        state.outputs = outputs;
        state.logs = logs;
        Ok(state.clone())
    }

    pub fn mark_error(
        &mut self,
        id: &str,
        message: impl Into<String>,
        logs: Vec<LogEntry>,
    ) -> Result<ExecutionState, StateError> {
        let state = self.transition(id, ExecutionStatus::Running, ExecutionStatus::Error)?;
        state.ended_at = Some(Instant::now());
        state.error = Some(message.into());
        state.logs = logs;
        Ok(state.clone())
    }

    /// Not reached by the runner today; reserved for conditional branching.
    pub fn mark_skipped(&mut self, id: &str) -> Result<ExecutionState, StateError> {
        let state = self.transition(id, ExecutionStatus::Pending, ExecutionStatus::Skipped)?;
        Ok(state.clone())
    }

    pub fn remove(&mut self, id: &str) -> Option<ExecutionState> {
        self.order.retain(|n| n != id);
        self.states.remove(id)
    }

    /// All states in graph order.
    pub fn snapshot(&self) -> Vec<(NodeId, ExecutionState)> {
        self.order
            .iter()
            .filter_map(|id| self.states.get(id).map(|s| (id.clone(), s.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn transition(
        &mut self,
        id: &str,
        from: ExecutionStatus,
        to: ExecutionStatus,
    ) -> Result<&mut ExecutionState, StateError> {
        let state = self
            .states
            .get_mut(id)
            .ok_or_else(|| StateError::UnknownNode(id.to_string()))?;
        if state.status != from {
            return Err(StateError::IllegalTransition {
                node_id: id.to_string(),
                from: state.status,
                to,
            });
        }
        state.status = to;
        Ok(state)
    }
}
