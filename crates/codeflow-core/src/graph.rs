//! Read-only graph view over a run's call tree.
//!
//! Visualization collaborators walk the call tree with petgraph instead of
//! reaching into the node and edge lists. Node weights are [`NodeId`]s; the
//! view borrows nothing, so it can outlive the result it was built from.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::id::NodeId;
use crate::result::RunResult;

/// Directed call graph: one vertex per call node, one edge per call edge.
#[derive(Debug, Clone)]
pub struct CallGraph {
    graph: DiGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
}

impl CallGraph {
    pub fn from_result(result: &RunResult) -> Self {
        let mut graph = DiGraph::with_capacity(result.nodes().len(), result.edges().len());
        let mut index = HashMap::with_capacity(result.nodes().len());
        for node in result.nodes() {
            index.insert(node.id(), graph.add_node(node.id()));
        }
        for edge in result.edges() {
            if let (Some(&from), Some(&to)) = (index.get(&edge.parent_id), index.get(&edge.child_id))
            {
                graph.add_edge(from, to, ());
            }
        }
        CallGraph { graph, index }
    }

    pub fn graph(&self) -> &DiGraph<NodeId, ()> {
        &self.graph
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Callees of `id` in call order.
    pub fn callees(&self, id: NodeId) -> Vec<NodeId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        // petgraph yields outgoing edges newest first.
        let mut out: Vec<NodeId> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect();
        out.reverse();
        out
    }
}

impl RunResult {
    pub fn call_graph(&self) -> CallGraph {
        CallGraph::from_result(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Locals;
    use crate::id::EventId;
    use crate::node::{CallEdge, CallNode};
    use crate::recorder::RecordedTrace;

    fn node(id: u64) -> CallNode {
        CallNode::new(NodeId(id), "fib", "fib.flow", EventId(id), Locals::new()).unwrap()
    }

    #[test]
    fn builds_tree_shape() {
        let result = RunResult::ok(
            RecordedTrace {
                events: vec![],
                nodes: vec![node(1), node(2), node(3)],
                edges: vec![
                    CallEdge::new(NodeId(1), NodeId(2)),
                    CallEdge::new(NodeId(1), NodeId(3)),
                ],
            },
            vec![],
        );
        let graph = result.call_graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.callees(NodeId(1)), vec![NodeId(2), NodeId(3)]);
        assert!(graph.callees(NodeId(3)).is_empty());
        assert!(graph.callees(NodeId(42)).is_empty());
        assert!(!petgraph::algo::is_cyclic_directed(graph.graph()));
    }
}
