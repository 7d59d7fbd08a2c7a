//! Core abstractions for the wireflow engine
//!
//! Values, ports, the node contract, the graph model, execution state
//! types, the memory collaborator and observer plumbing. No scheduling or
//! execution happens here.

mod error;
pub mod events;
mod graph;
mod memory;
mod node;
mod port;
mod state;
mod value;
mod workflow;

pub use error::{
    FlowError, GraphError, MemoryError, NodeError, RunError, StateError, WorkflowError,
};
pub use events::*;
pub use graph::{Edge, EdgeId, EdgeKind, Graph, GraphNode, NodeId};
pub use memory::{InMemoryMemory, Memory};
pub use node::{Node, NodeContext, NodeLogger, NodeOutput};
pub use port::{PortKind, PortSpec};
pub use state::{
    ExecutionState, ExecutionStatus, LogEntry, LogLevel, RunId, RunOutcome, RunSummary,
};
pub use value::Value;
pub use workflow::{ConnectionDocument, NodeDocument, Position, WorkflowDocument};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
