//! The terminal aggregate of one traced run and its mapping form.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::event::{Event, EventKind};
use crate::id::NodeId;
use crate::node::{CallEdge, CallNode};
use crate::recorder::RecordedTrace;

/// Outcome of a traced run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    /// An exception escaped the traced unit.
    RuntimeError,
}

impl RunStatus {
    /// The mapping spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::RuntimeError => "runtime_error",
        }
    }
}

/// Everything a run produced: status, optional failure description, and the
/// full event log and call tree, including partial traces of failed runs.
///
/// Field order matches the mapping form:
/// `{status, error, nodes, edges, events}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    status: RunStatus,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    nodes: Vec<CallNode>,
    #[serde(default)]
    edges: Vec<CallEdge>,
    #[serde(default)]
    events: Vec<Event>,
    /// Lines the traced unit printed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    output: Vec<String>,
}

/// Counts over a result, for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceSummary {
    pub calls: usize,
    pub lines: usize,
    pub returns: usize,
    pub exceptions: usize,
    pub nodes: usize,
    pub edges: usize,
    pub abandoned: usize,
    pub max_depth: usize,
}

impl RunResult {
    pub fn ok(trace: RecordedTrace, output: Vec<String>) -> Self {
        RunResult::from_parts(RunStatus::Ok, None, trace, output)
    }

    pub fn runtime_error(trace: RecordedTrace, error: String, output: Vec<String>) -> Self {
        RunResult::from_parts(RunStatus::RuntimeError, Some(error), trace, output)
    }

    fn from_parts(
        status: RunStatus,
        error: Option<String>,
        trace: RecordedTrace,
        output: Vec<String>,
    ) -> Self {
        let RecordedTrace {
            events,
            nodes,
            edges,
        } = trace;
        RunResult {
            status,
            error,
            nodes,
            edges,
            events,
            output,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == RunStatus::Ok
    }

    /// Failure description; present iff the status is `RuntimeError`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn nodes(&self) -> &[CallNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn node(&self, id: NodeId) -> Option<&CallNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    /// Nodes that were not called from another traced node.
    pub fn roots(&self) -> impl Iterator<Item = &CallNode> + '_ {
        let children: HashSet<NodeId> =
            self.edges.iter().map(|e| e.child_id).collect();
        self.nodes
            .iter()
            .filter(move |n| !children.contains(&n.id()))
    }

    /// Direct callees of `parent`, in call order.
    pub fn children_of(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.parent_id == parent)
            .map(|e| e.child_id)
    }

    pub fn summary(&self) -> TraceSummary {
        let mut summary = TraceSummary {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            abandoned: self.nodes.iter().filter(|n| n.is_abandoned()).count(),
            ..TraceSummary::default()
        };
        for event in &self.events {
            match event.kind() {
                EventKind::Call => summary.calls += 1,
                EventKind::Line => summary.lines += 1,
                EventKind::Return => summary.returns += 1,
                EventKind::Exception => summary.exceptions += 1,
            }
        }

        let parents = self.parents();
        summary.max_depth = self
            .nodes
            .iter()
            .map(|n| self.depth_of(n.id(), &parents).unwrap_or(summary.nodes))
            .max()
            .unwrap_or(0);
        summary
    }

    fn parents(&self) -> HashMap<NodeId, NodeId> {
        self.edges
            .iter()
            .map(|e| (e.child_id, e.parent_id))
            .collect()
    }

    /// Number of nodes from `id` up to its root, or `None` if the parent
    /// chain is longer than the node count and so must loop.
    fn depth_of(&self, id: NodeId, parents: &HashMap<NodeId, NodeId>) -> Option<usize> {
        let mut depth = 1;
        let mut current = id;
        while let Some(&parent) = parents.get(&current) {
            if depth >= self.nodes.len() {
                return None;
            }
            depth += 1;
            current = parent;
        }
        Some(depth)
    }

    /// Converts the result into a plain mapping made of strings, numbers,
    /// nulls, arrays and objects.
    pub fn to_mapping(&self) -> serde_json::Value {
        // Every field is a string, integer, option, sequence or string-keyed
        // map, so conversion cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Rebuilds a result from its mapping form and validates every record.
    pub fn from_mapping(mapping: serde_json::Value) -> Result<Self, ModelError> {
        let result: RunResult = serde_json::from_value(mapping)?;
        for event in &result.events {
            event.validate()?;
        }
        for node in &result.nodes {
            node.validate()?;
        }
        if result.error.is_some() != (result.status == RunStatus::RuntimeError) {
            return Err(ModelError::StatusErrorMismatch {
                status: result.status.as_str(),
                has_error: result.error.is_some(),
            });
        }
        result.validate_edges()?;
        Ok(result)
    }

    /// The edges must form a forest over the known nodes.
    fn validate_edges(&self) -> Result<(), ModelError> {
        let known: HashSet<NodeId> = self.nodes.iter().map(CallNode::id).collect();
        let mut children = HashSet::new();
        for edge in &self.edges {
            if !known.contains(&edge.parent_id) || !known.contains(&edge.child_id) {
                return Err(ModelError::DanglingEdge {
                    parent: edge.parent_id,
                    child: edge.child_id,
                });
            }
            if !children.insert(edge.child_id) {
                return Err(ModelError::MultipleParents { id: edge.child_id });
            }
        }
        let parents = self.parents();
        for node in &self.nodes {
            if self.depth_of(node.id(), &parents).is_none() {
                return Err(ModelError::CyclicEdges { id: node.id() });
            }
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
