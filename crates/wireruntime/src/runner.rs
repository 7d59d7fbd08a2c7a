use crate::{config::RuntimeConfig, scheduler::Scheduler, store::ExecutionStateStore};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use wirecore::{
    Edge, EdgeId, EdgeKind, ExecutionObserver, ExecutionState, ExecutionStatus, Graph,
    GraphError, GraphNode, InMemoryMemory, Memory, Node, NodeContext, NodeError, NodeId,
    NodeLogger, RunError, RunId, RunOutcome, RunSummary, StateError, Value,
};

/// Where the runner is in its current (or last) run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    ComputingOrder,
    Executing,
    Completed,
    Aborted,
}

/// Executes a graph one node at a time in scheduler order.
///
/// Each `run()` resets every node to pending, computes the order, then
/// walks it: inputs are resolved from upstream data edges whose source
/// succeeded, the node is invoked, and its result is recorded. The first
/// node failure halts the run; later nodes stay pending. Node failures are
/// reported through the execution state, never as an error from `run()`.
pub struct FlowRunner {
    graph: RwLock<Graph>,
    store: RwLock<ExecutionStateStore>,
    phase: RwLock<RunPhase>,
    cancellation: RwLock<CancellationToken>,
    memory: Arc<dyn Memory>,
    observers: Vec<Arc<dyn ExecutionObserver>>,
    config: RuntimeConfig,
    running: AtomicBool,
    stop_requested: AtomicBool,
}

/// Clears the in-flight flags however the run future ends.
struct RunGuard<'a> {
    runner: &'a FlowRunner,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.runner.stop_requested.store(false, Ordering::SeqCst);
        self.runner.running.store(false, Ordering::SeqCst);
    }
}

enum Step {
    Succeeded,
    Failed,
    /// The node gave up because `stop()` cancelled its token.
    Cancelled,
}

impl FlowRunner {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: RwLock::new(graph),
            store: RwLock::new(ExecutionStateStore::new()),
            phase: RwLock::new(RunPhase::Idle),
            cancellation: RwLock::new(CancellationToken::new()),
            memory: Arc::new(InMemoryMemory::new()),
            observers: Vec::new(),
            config: RuntimeConfig::default(),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn memory(&self) -> &Arc<dyn Memory> {
        &self.memory
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn phase(&self) -> RunPhase {
        *self.phase.read().await
    }

    /// Snapshot of every node's state, in graph order.
    pub async fn states(&self) -> Vec<(NodeId, ExecutionState)> {
        self.store.read().await.snapshot()
    }

    pub async fn state(&self, node_id: &str) -> Option<ExecutionState> {
        self.store.read().await.get(node_id).cloned()
    }

    /// Copy of the current graph.
    pub async fn graph(&self) -> Graph {
        self.graph.read().await.clone()
    }

    /// Ask the in-flight run to stop before its next node.
    ///
    /// The node currently executing is not interrupted unless it watches
    /// its cancellation token.
    pub async fn stop(&self) {
        if !self.is_running() {
            return;
        }
        self.stop_requested.store(true, Ordering::SeqCst);
        self.cancellation.read().await.cancel();
        tracing::info!("Stop requested");
    }

    pub async fn add_node(
        &self,
        id: impl Into<NodeId>,
        node: Arc<dyn Node>,
    ) -> Result<(), GraphError> {
        let mut graph = self.graph.write().await;
        self.ensure_idle()?;
        graph.add_node(id, node)
    }

    /// Remove a node, its edges and its execution state.
    pub async fn remove_node(&self, id: &str) -> Result<Vec<Edge>, GraphError> {
        let mut graph = self.graph.write().await;
        self.ensure_idle()?;
        let removed = graph.remove_node(id)?;
        self.store.write().await.remove(id);
        Ok(removed)
    }

    pub async fn add_edge(&self, edge: Edge) -> Result<EdgeId, GraphError> {
        let mut graph = self.graph.write().await;
        self.ensure_idle()?;
        graph.add_edge(edge)
    }

    pub async fn connect(
        &self,
        source: impl Into<NodeId>,
        source_output: impl Into<String>,
        target: impl Into<NodeId>,
        target_input: impl Into<String>,
    ) -> Result<EdgeId, GraphError> {
        self.add_edge(Edge::new(source, source_output, target, target_input))
            .await
    }

    pub async fn remove_edge(&self, id: &str) -> Result<Edge, GraphError> {
        let mut graph = self.graph.write().await;
        self.ensure_idle()?;
        graph.remove_edge(id)
    }

    /// Swap in a whole new graph, e.g. after loading a workflow.
    pub async fn replace_graph(&self, replacement: Graph) -> Result<(), GraphError> {
        let mut graph = self.graph.write().await;
        self.ensure_idle()?;
        *graph = replacement;
        self.store.write().await.reset(Vec::new());
        Ok(())
    }

    /// Execute the graph once.
    ///
    /// Returns `AlreadyRunning` if another run is in flight on this runner
    /// and `CycleDetected` if the graph cannot be ordered; in both cases no
    /// node executes. Otherwise resolves with a report, even when a node
    /// failed.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Run rejected: a previous run is still in flight");
            return Err(RunError::AlreadyRunning);
        }
        let _guard = RunGuard { runner: self };

        let run_id = RunId::new_v4();
        let started = Instant::now();
        let cancellation = CancellationToken::new();
        *self.cancellation.write().await = cancellation.clone();
        if self.stop_requested.load(Ordering::SeqCst) {
            cancellation.cancel();
        }

        // Editors check `running` under the graph write lock, so once this
        // read lock is held no edit can touch the graph or the store.
        let graph = {
            let current = self.graph.read().await;
            self.store
                .write()
                .await
                .reset(current.nodes().iter().map(|n| n.id.clone()));
            current.clone()
        };
        tracing::info!(%run_id, nodes = graph.len(), edges = graph.edges().len(), "Starting run");
        for observer in &self.observers {
            observer.on_run_started(run_id);
        }

        let pending = ExecutionState::pending();
        for node in graph.nodes() {
            self.notify_state(run_id, &node.id, &pending);
        }

        self.set_phase(RunPhase::ComputingOrder).await;
        let order = match Scheduler::execution_order(&graph) {
            Ok(order) => order,
            Err(err) => return Err(self.abort(run_id, err, 0, started).await),
        };
        tracing::debug!(%run_id, ?order, "Execution order computed");

        self.set_phase(RunPhase::Executing).await;
        let mut outcome = RunOutcome::Finished;
        let mut executed = 0;
        for (position, node_id) in order.iter().enumerate() {
            if self.stop_requested.load(Ordering::SeqCst) {
                tracing::info!(%run_id, %node_id, "Run stopped before node");
                outcome = RunOutcome::Stopped {
                    before: node_id.clone(),
                };
                break;
            }
            let Some(entry) = graph.node(node_id) else {
                continue;
            };

            executed += 1;
            let step = match self.execute_node(run_id, &graph, entry, &cancellation).await {
                Ok(step) => step,
                Err(err) => return Err(self.abort(run_id, err.into(), executed, started).await),
            };
            match step {
                Step::Succeeded => {}
                Step::Failed => {
                    outcome = RunOutcome::Halted {
                        node_id: node_id.clone(),
                    };
                    break;
                }
                Step::Cancelled => {
                    // The cancelled node is the resume point when it was last.
                    let before = order.get(position + 1).unwrap_or(node_id);
                    tracing::info!(%run_id, %node_id, "Run stopped while node was in flight");
                    outcome = RunOutcome::Stopped {
                        before: before.clone(),
                    };
                    break;
                }
            }
        }

        self.set_phase(RunPhase::Completed).await;
        let duration = started.elapsed();
        tracing::info!(
            %run_id,
            executed,
            duration_ms = duration.as_millis() as u64,
            ?outcome,
            "Run completed"
        );
        self.notify_complete(&RunSummary {
            run_id,
            outcome: outcome.clone(),
            executed,
            duration,
        });

        let states = self.store.read().await.snapshot();
        Ok(RunReport {
            run_id,
            order,
            outcome,
            states,
            duration,
        })
    }

    async fn execute_node(
        &self,
        run_id: RunId,
        graph: &Graph,
        entry: &GraphNode,
        cancellation: &CancellationToken,
    ) -> Result<Step, StateError> {
        let node_id = entry.id.as_str();
        let running = {
            let mut store = self.store.write().await;
            let inputs = resolve_inputs(graph, &store, node_id);
            store.mark_running(node_id, inputs)?
        };
        self.notify_state(run_id, node_id, &running);
        tracing::debug!(%run_id, %node_id, node_type = entry.node.node_type(), "Node started");

        let capacity = self.config.max_log_entries;
        let (log_tx, mut log_rx) = mpsc::channel(capacity.max(1));
        let logger = if self.config.capture_node_logs && capacity > 0 {
            NodeLogger::new(node_id, log_tx)
        } else {
            NodeLogger::detached(node_id)
        };
        let ctx = NodeContext::new(node_id, run_id, Arc::clone(&self.memory))
            .with_inputs(running.inputs.clone())
            .with_logger(logger)
            .with_cancellation(cancellation.child_token());

        let result = entry.node.execute(ctx).await;

        let mut logs = Vec::new();
        while let Ok(log_entry) = log_rx.try_recv() {
            logs.push(log_entry);
        }

        match result {
            Ok(output) => {
                let state = self
                    .store
                    .write()
                    .await
                    .mark_success(node_id, output.outputs, logs)?;
                tracing::info!(
                    %run_id,
                    %node_id,
                    duration_ms = state.duration().unwrap_or_default().as_millis() as u64,
                    "Node completed"
                );
                self.notify_state(run_id, node_id, &state);
                Ok(Step::Succeeded)
            }
            Err(err) => {
                let stopped = matches!(err, NodeError::Cancelled)
                    && self.stop_requested.load(Ordering::SeqCst);
                if stopped {
                    tracing::info!(%run_id, %node_id, "Node cancelled by stop request");
                } else {
                    tracing::error!(%run_id, %node_id, error = %err, "Node failed, halting run");
                }
                let state = self
                    .store
                    .write()
                    .await
                    .mark_error(node_id, err.to_string(), logs)?;
                self.notify_state(run_id, node_id, &state);
                Ok(if stopped { Step::Cancelled } else { Step::Failed })
            }
        }
    }

    /// End a run that could not continue: phase `Aborted`, completion still
    /// reported to observers.
    async fn abort(
        &self,
        run_id: RunId,
        err: RunError,
        executed: usize,
        started: Instant,
    ) -> RunError {
        tracing::error!(%run_id, error = %err, "Aborting run");
        self.set_phase(RunPhase::Aborted).await;
        self.notify_complete(&RunSummary {
            run_id,
            outcome: RunOutcome::Aborted {
                reason: err.to_string(),
            },
            executed,
            duration: started.elapsed(),
        });
        err
    }

    fn ensure_idle(&self) -> Result<(), GraphError> {
        if self.is_running() {
            Err(GraphError::RunInProgress)
        } else {
            Ok(())
        }
    }

    async fn set_phase(&self, phase: RunPhase) {
        *self.phase.write().await = phase;
    }

    fn notify_state(&self, run_id: RunId, node_id: &str, state: &ExecutionState) {
        for observer in &self.observers {
            observer.on_node_state_change(run_id, node_id, state);
        }
    }

    fn notify_complete(&self, summary: &RunSummary) {
        for observer in &self.observers {
            observer.on_execution_complete(summary);
        }
    }
}

/// Inputs for a node from its incoming data edges.
///
/// Only edges whose source succeeded and produced the named output
/// contribute. Values for an input that accepts several connections are
/// collected into an array in edge order.
fn resolve_inputs(
    graph: &Graph,
    store: &ExecutionStateStore,
    node_id: &str,
) -> HashMap<String, Value> {
    let multiple: HashSet<String> = graph
        .node(node_id)
        .map(|n| {
            n.node
                .inputs()
                .into_iter()
                .filter(|p| p.multiple)
                .map(|p| p.name)
                .collect()
        })
        .unwrap_or_default();

    let mut inputs = HashMap::new();
    for edge in graph.incoming_edges(node_id) {
        if edge.kind != EdgeKind::Data {
            continue;
        }
        let Some(value) = store.output(&edge.source, &edge.source_output) else {
            continue;
        };

        if multiple.contains(&edge.target_input) {
            let slot = inputs
                .entry(edge.target_input.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = slot {
                items.push(value.clone());
            }
        } else {
            inputs.insert(edge.target_input.clone(), value.clone());
        }
    }
    inputs
}

/// Result of one `run()`
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    /// The full scheduled order, including nodes that never ran.
    pub order: Vec<NodeId>,
    pub outcome: RunOutcome,
    pub states: Vec<(NodeId, ExecutionState)>,
    pub duration: Duration,
}

impl RunReport {
    pub fn state(&self, node_id: &str) -> Option<&ExecutionState> {
        self.states
            .iter()
            .find(|(id, _)| id == node_id)
            .map(|(_, state)| state)
    }

    pub fn status(&self, node_id: &str) -> Option<ExecutionStatus> {
        self.state(node_id).map(|s| s.status)
    }

    /// True when every node in the order succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Finished
    }

    pub fn failed_node(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Halted { node_id } => Some(node_id.as_str()),
            _ => None,
        }
    }
}
