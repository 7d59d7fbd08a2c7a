use crate::{EdgeId, FlowError, NodeId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Persisted form of a workflow as the editor saves it.
///
/// Only ids, types, configuration and connections matter to the engine;
/// positions and any other editor fields are carried but ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub connections: Vec<ConnectionDocument>,
}

impl WorkflowDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FlowError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, FlowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn add_node(&mut self, node: NodeDocument) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn connect(
        &mut self,
        source: impl Into<NodeId>,
        source_output: impl Into<String>,
        target: impl Into<NodeId>,
        target_input: impl Into<String>,
    ) {
        self.connections.push(ConnectionDocument {
            id: Some(Uuid::new_v4().to_string()),
            source: source.into(),
            source_output: source_output.into(),
            target: target.into(),
            target_input: target_input.into(),
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Node configuration, interpreted by the node's factory.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl NodeDocument {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDocument {
    #[serde(default)]
    pub id: Option<EdgeId>,
    pub source: NodeId,
    pub source_output: String,
    pub target: NodeId,
    pub target_input: String,
}

/// Node position in the visual editor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}
