use crate::{registry::NodeRegistry, scheduler::Scheduler};
use wirecore::{Edge, FlowError, Graph, NodeId, WorkflowDocument};

/// Build a graph from a persisted workflow.
///
/// Nodes are created through the registry and inserted in document order;
/// connections go through the same validation as `Graph::add_edge`.
pub fn load_graph(
    document: &WorkflowDocument,
    registry: &NodeRegistry,
) -> Result<Graph, FlowError> {
    let mut graph = Graph::new();

    for spec in &document.nodes {
        let node = registry.create_node(&spec.node_type, &spec.data)?;
        graph.add_node(spec.id.clone(), node)?;
    }

    for conn in &document.connections {
        let mut edge = Edge::new(
            conn.source.clone(),
            conn.source_output.clone(),
            conn.target.clone(),
            conn.target_input.clone(),
        );
        if let Some(id) = &conn.id {
            edge = edge.with_id(id.clone());
        }
        graph.add_edge(edge)?;
    }

    tracing::debug!(
        nodes = graph.len(),
        edges = graph.edges().len(),
        "Loaded workflow graph"
    );
    Ok(graph)
}

/// Load the document and check it can be scheduled.
///
/// Returns the execution order a run would use.
pub fn validate(
    document: &WorkflowDocument,
    registry: &NodeRegistry,
) -> Result<Vec<NodeId>, FlowError> {
    let graph = load_graph(document, registry)?;
    Ok(Scheduler::execution_order(&graph)?)
}
