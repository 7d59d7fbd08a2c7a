//! Workflow execution runtime
//!
//! This crate provides the scheduler that orders a graph, the runner that
//! executes it, the per-run execution state store, the node registry and
//! the workflow loader.

mod config;
mod loader;
mod registry;
mod runner;
mod scheduler;
mod store;

pub use config::RuntimeConfig;
pub use loader::{load_graph, validate};
pub use registry::{NodeFactory, NodeMetadata, NodeRegistry};
pub use runner::{FlowRunner, RunPhase, RunReport};
pub use scheduler::Scheduler;
pub use store::ExecutionStateStore;
