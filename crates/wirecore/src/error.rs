use crate::{ExecutionStatus, NodeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Run error: {0}")]
    Run(#[from] RunError),

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Rejected graph mutations. The graph is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Input '{port}' of node {node_id} already has a connection")]
    Capacity { node_id: NodeId, port: String },

    #[error("Graph cannot be edited while a run is in progress")]
    RunInProgress,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Cycle detected at node {node_id}")]
    CycleDetected { node_id: NodeId },

    #[error("A run is already in progress")]
    AlreadyRunning,

    #[error("Execution state error: {0}")]
    State(#[from] StateError),
}

#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Memory backend unavailable: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("No execution state for node {0}")]
    UnknownNode(NodeId),

    #[error("Node {node_id} cannot move from {from} to {to}")]
    IllegalTransition {
        node_id: NodeId,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Invalid workflow: {0}")]
    Invalid(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
}
