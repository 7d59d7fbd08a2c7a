use crate::{ExecutionState, RunId, RunSummary};

/// Receives execution progress from the runner.
///
/// Callbacks run inline on the runner's task, between node executions, so
/// they should return quickly.
pub trait ExecutionObserver: Send + Sync {
    fn on_run_started(&self, _run_id: RunId) {}

    /// Called on every state transition, including the reset to pending.
    fn on_node_state_change(&self, _run_id: RunId, _node_id: &str, _state: &ExecutionState) {}

    fn on_execution_complete(&self, _summary: &RunSummary) {}
}

/// Observer built from two closures
pub struct FnObserver<S, C> {
    on_state: S,
    on_complete: C,
}

impl<S, C> FnObserver<S, C>
where
    S: Fn(&str, &ExecutionState) + Send + Sync,
    C: Fn(&RunSummary) + Send + Sync,
{
    pub fn new(on_state: S, on_complete: C) -> Self {
        Self {
            on_state,
            on_complete,
        }
    }
}

impl<S, C> ExecutionObserver for FnObserver<S, C>
where
    S: Fn(&str, &ExecutionState) + Send + Sync,
    C: Fn(&RunSummary) + Send + Sync,
{
    fn on_node_state_change(&self, _run_id: RunId, node_id: &str, state: &ExecutionState) {
        (self.on_state)(node_id, state)
    }

    fn on_execution_complete(&self, summary: &RunSummary) {
        (self.on_complete)(summary)
    }
}
