use std::collections::HashMap;
use std::sync::Arc;
use wirecore::{Node, NodeError, PortSpec, WorkflowError};

/// Factory trait for creating node instances
pub trait NodeFactory: Send + Sync {
    /// Create a new instance of the node with given configuration
    fn create(&self, config: &serde_json::Value) -> Result<Arc<dyn Node>, NodeError>;

    /// Get node type identifier
    fn node_type(&self) -> &str;

    /// Optional: Get node metadata (description, ports, etc.)
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::default()
    }
}

/// Metadata about a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub description: String,
    pub category: String,
    pub inputs: Vec<PortSpec>,
    pub outputs: Vec<PortSpec>,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

/// Registry of available node types
#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<String, Arc<dyn NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node factory, replacing any factory for the same type
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let node_type = factory.node_type().to_string();
        tracing::debug!("Registering node type: {}", node_type);
        self.factories.insert(node_type, factory);
    }

    /// Create a node instance from a node type and config
    pub fn create_node(
        &self,
        node_type: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn Node>, WorkflowError> {
        let factory = self
            .factories
            .get(node_type)
            .ok_or_else(|| WorkflowError::UnknownNodeType(node_type.to_string()))?;

        factory.create(config).map_err(|e| {
            WorkflowError::Invalid(format!("Failed to create {} node: {}", node_type, e))
        })
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Get all registered node types, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<NodeMetadata> {
        self.factories.get(node_type).map(|f| f.metadata())
    }
}
