use crate::{LogEntry, LogLevel, Memory, NodeError, NodeId, PortSpec, RunId, Value};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

/// Core trait that all executable nodes implement
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique type identifier (e.g., "http.fetch", "filter.keyword")
    fn node_type(&self) -> &str;

    fn inputs(&self) -> Vec<PortSpec> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<PortSpec> {
        Vec::new()
    }

    /// Configuration snapshot, for saving and inspection.
    fn config(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Execute the node. Called at most once per run.
    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError>;
}

/// Execution context passed to each node
#[derive(Clone)]
pub struct NodeContext {
    pub node_id: NodeId,

    pub run_id: RunId,

    /// Values resolved from upstream data edges
    pub inputs: HashMap<String, Value>,

    /// Key-value store that outlives individual runs
    pub memory: Arc<dyn Memory>,

    pub log: NodeLogger,

    /// Cancelled when the run is stopped
    pub cancellation: CancellationToken,
}

impl NodeContext {
    pub fn new(node_id: impl Into<NodeId>, run_id: RunId, memory: Arc<dyn Memory>) -> Self {
        let node_id = node_id.into();
        Self {
            log: NodeLogger::detached(node_id.clone()),
            node_id,
            run_id,
            inputs: HashMap::new(),
            memory,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: HashMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_input(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(port.into(), value.into());
        self
    }

    pub fn with_logger(mut self, log: NodeLogger) -> Self {
        self.log = log;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }
}

/// Structured logger handed to nodes.
///
/// Every message goes to `tracing`; when the logger is attached to a run the
/// entry is also recorded in the node's execution state. The sink is bounded:
/// once it is full further entries only reach `tracing`.
#[derive(Clone)]
pub struct NodeLogger {
    node_id: NodeId,
    sink: Option<Sender<LogEntry>>,
}

impl NodeLogger {
    pub fn new(node_id: impl Into<NodeId>, sink: Sender<LogEntry>) -> Self {
        Self {
            node_id: node_id.into(),
            sink: Some(sink),
        }
    }

    /// Logger that only forwards to `tracing`.
    pub fn detached(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            sink: None,
        }
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => tracing::debug!(node_id = %self.node_id, "{}", message),
            LogLevel::Info => tracing::info!(node_id = %self.node_id, "{}", message),
            LogLevel::Warn => tracing::warn!(node_id = %self.node_id, "{}", message),
            LogLevel::Error => tracing::error!(node_id = %self.node_id, "{}", message),
        }
        if let Some(sink) = &self.sink {
            // Full means the per-node cap was reached.
            let _ = sink.try_send(LogEntry {
                level,
                message,
                timestamp: Utc::now(),
            });
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }
}

/// Output from node execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeOutput {
    /// Output port values
    pub outputs: HashMap<String, Value>,
}

impl NodeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(port.into(), value.into());
        self
    }
}
