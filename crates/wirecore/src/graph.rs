use crate::{GraphError, Node, PortKind, PortSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub type NodeId = String;
pub type EdgeId = String;

/// Which signal an edge carries. Both kinds order execution; only data
/// edges carry values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Exec,
    Data,
}

impl EdgeKind {
    /// An edge touching an exec port is an exec edge.
    pub fn between(source: PortKind, target: PortKind) -> Self {
        if source == PortKind::Exec || target == PortKind::Exec {
            EdgeKind::Exec
        } else {
            EdgeKind::Data
        }
    }
}

/// Connection from one node's output port to another node's input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub source_output: String,
    pub target: NodeId,
    pub target_input: String,
    /// Resolved from the port declarations when the edge is added.
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(
        source: impl Into<NodeId>,
        source_output: impl Into<String>,
        target: impl Into<NodeId>,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            source_output: source_output.into(),
            target: target.into(),
            target_input: target_input.into(),
            kind: EdgeKind::Data,
        }
    }

    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = id.into();
        self
    }

    fn same_endpoints(&self, other: &Edge) -> bool {
        self.source == other.source
            && self.source_output == other.source_output
            && self.target == other.target
            && self.target_input == other.target_input
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source, self.source_output, self.target, self.target_input
        )
    }
}

/// A node instance registered in the graph
#[derive(Clone)]
pub struct GraphNode {
    pub id: NodeId,
    pub node: Arc<dyn Node>,
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("node_type", &self.node.node_type())
            .finish()
    }
}

/// Nodes and edges of a workflow.
///
/// Nodes keep their insertion order, which the scheduler uses to break
/// ties. Cloning is cheap: node instances are shared.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        node: Arc<dyn Node>,
    ) -> Result<(), GraphError> {
        let id = id.into();
        if self.contains(&id) {
            return Err(GraphError::DuplicateId(id));
        }
        self.nodes.push(GraphNode { id, node });
        Ok(())
    }

    /// Remove a node together with every edge that touches it.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<Edge>, GraphError> {
        let position = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        self.nodes.remove(position);

        let (removed, kept): (Vec<Edge>, Vec<Edge>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.source == id || e.target == id);
        self.edges = kept;
        Ok(removed)
    }

    /// Validate and insert an edge, returning its id.
    pub fn add_edge(&mut self, mut edge: Edge) -> Result<EdgeId, GraphError> {
        if edge.source == edge.target {
            return Err(GraphError::InvalidConnection(format!(
                "node {} cannot connect to itself",
                edge.source
            )));
        }
        if self.edges.iter().any(|e| e.id == edge.id) {
            return Err(GraphError::DuplicateId(edge.id));
        }
        if self.edges.iter().any(|e| e.same_endpoints(&edge)) {
            return Err(GraphError::InvalidConnection(format!(
                "{} is already connected",
                edge
            )));
        }

        let source = self.node(&edge.source).ok_or_else(|| {
            GraphError::InvalidConnection(format!("unknown source node {}", edge.source))
        })?;
        let target = self.node(&edge.target).ok_or_else(|| {
            GraphError::InvalidConnection(format!("unknown target node {}", edge.target))
        })?;

        let output = find_port(source.node.outputs(), &edge.source_output).ok_or_else(|| {
            GraphError::InvalidConnection(format!(
                "node {} has no output '{}'",
                edge.source, edge.source_output
            ))
        })?;
        let input = find_port(target.node.inputs(), &edge.target_input).ok_or_else(|| {
            GraphError::InvalidConnection(format!(
                "node {} has no input '{}'",
                edge.target, edge.target_input
            ))
        })?;

        if !output.kind.is_compatible_with(input.kind) {
            return Err(GraphError::InvalidConnection(format!(
                "{} output cannot feed {} input ({})",
                output.kind, input.kind, edge
            )));
        }
        if !input.multiple
            && self
                .edges
                .iter()
                .any(|e| e.target == edge.target && e.target_input == edge.target_input)
        {
            return Err(GraphError::Capacity {
                node_id: edge.target,
                port: edge.target_input,
            });
        }

        edge.kind = EdgeKind::between(output.kind, input.kind);
        let id = edge.id.clone();
        self.edges.push(edge);
        Ok(id)
    }

    pub fn connect(
        &mut self,
        source: impl Into<NodeId>,
        source_output: impl Into<String>,
        target: impl Into<NodeId>,
        target_input: impl Into<String>,
    ) -> Result<EdgeId, GraphError> {
        self.add_edge(Edge::new(source, source_output, target, target_input))
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge, GraphError> {
        let position = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        Ok(self.edges.remove(position))
    }

    pub fn incoming_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.target == node_id).collect()
    }

    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.source == node_id).collect()
    }

    /// Distinct nodes this node depends on, in edge order.
    pub fn dependencies(&self, node_id: &str) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        for edge in self.incoming_edges(node_id) {
            if !deps.contains(&edge.source.as_str()) {
                deps.push(&edge.source);
            }
        }
        deps
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn find_port(ports: Vec<PortSpec>, name: &str) -> Option<PortSpec> {
    ports.into_iter().find(|p| p.name == name)
}
