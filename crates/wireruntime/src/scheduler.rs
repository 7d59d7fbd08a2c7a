use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, Control, DfsEvent};
use std::collections::HashMap;
use wirecore::{Graph, NodeId, RunError};

/// Computes the execution order of a graph.
///
/// Exec and data edges are both ordering constraints: an edge target runs
/// after its source. The order is a depth-first post-order over the
/// dependency relation, so it is stable for an unchanged graph.
pub struct Scheduler;

impl Scheduler {
    /// Every node id, each after all of its dependencies.
    ///
    /// Roots are visited in node insertion order and a node's dependencies
    /// are visited in insertion order as well. Reaching a node that is still
    /// on the DFS stack means a cycle; the error names that node.
    pub fn execution_order(graph: &Graph) -> Result<Vec<NodeId>, RunError> {
        let deps = dependency_graph(graph);
        let mut order = Vec::with_capacity(deps.node_count());

        let cycle_at = depth_first_search(&deps, deps.node_indices(), |event| match event {
            DfsEvent::BackEdge(_, on_stack) => Control::Break(on_stack),
            DfsEvent::Finish(done, _) => {
                order.push(done);
                Control::Continue
            }
            _ => Control::Continue,
        });

        if let Some(idx) = cycle_at.break_value() {
            return Err(RunError::CycleDetected {
                node_id: deps[idx].clone(),
            });
        }

        Ok(order.into_iter().map(|idx| deps[idx].clone()).collect())
    }
}

/// Graph whose edges point from a node to the nodes it depends on.
///
/// Node indices follow insertion order.
fn dependency_graph(graph: &Graph) -> DiGraph<NodeId, ()> {
    let mut deps = DiGraph::with_capacity(graph.len(), graph.edges().len());
    let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(graph.len());

    for node in graph.nodes() {
        index.insert(node.id.as_str(), deps.add_node(node.id.clone()));
    }

    for node in graph.nodes() {
        let this = index[node.id.as_str()];
        let mut upstream: Vec<NodeIndex> = graph
            .dependencies(&node.id)
            .into_iter()
            .filter_map(|id| index.get(id).copied())
            .collect();
        upstream.sort();

        // petgraph yields neighbors newest-first; add in reverse so the
        // DFS walks them in insertion order.
        for dep in upstream.into_iter().rev() {
            deps.add_edge(this, dep, ());
        }
    }

    deps
}
