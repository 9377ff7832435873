//! The trace recorder: turns runtime notifications into an event log and a
//! call tree.
//!
//! The recorder keeps an explicit stack of the call nodes that are currently
//! open. `call` pushes, `return` records and then pops, `line` and
//! `exception` attach to the innermost open node. Per open node the
//! lifecycle is:
//!
//! ```text
//! entered -> line* -> exited normally | exited with exception | abandoned
//! ```
//!
//! An `exception` marks the node but leaves it on the stack. The runtime
//! reports the frame actually leaving with a later `return`; if the run stops
//! first, the node stays open.
//!
//! Notifications from any file other than the traced one are discarded
//! before any id is allocated. `line`, `return` and `exception` with no open
//! node are dropped as well. The recorder never fails.

use std::collections::HashMap;

use tracing::trace;

use crate::event::{Event, EventKind, Locals, Site};
use crate::hook::{TraceEvent, TraceFrame, TraceHook};
use crate::id::{EventId, IdCounter, NodeId};
use crate::node::{CallEdge, CallNode};
use crate::render::ValueRenderer;

/// Everything a recorder accumulated, handed off once recording is over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedTrace {
    pub events: Vec<Event>,
    pub nodes: Vec<CallNode>,
    pub edges: Vec<CallEdge>,
}

/// Stateful consumer of [`TraceEvent`]s for one traced source file.
#[derive(Debug)]
pub struct TraceRecorder {
    traced_file: String,
    renderer: ValueRenderer,
    log: Vec<Event>,
    nodes: Vec<CallNode>,
    /// Node id to position in `nodes`.
    node_index: HashMap<NodeId, usize>,
    edges: Vec<CallEdge>,
    event_ids: IdCounter,
    node_ids: IdCounter,
    /// Open nodes, innermost last.
    stack: Vec<NodeId>,
}

impl TraceRecorder {
    pub fn new(traced_file: impl Into<String>, renderer: ValueRenderer) -> Self {
        TraceRecorder {
            traced_file: traced_file.into(),
            renderer,
            log: Vec::new(),
            nodes: Vec::new(),
            node_index: HashMap::new(),
            edges: Vec::new(),
            event_ids: IdCounter::default(),
            node_ids: IdCounter::default(),
            stack: Vec::new(),
        }
    }

    pub fn traced_file(&self) -> &str {
        &self.traced_file
    }

    pub fn events(&self) -> &[Event] {
        &self.log
    }

    pub fn nodes(&self) -> &[CallNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    /// Number of currently open call nodes.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn finish(self) -> RecordedTrace {
        RecordedTrace {
            events: self.log,
            nodes: self.nodes,
            edges: self.edges,
        }
    }

    fn snapshot_locals(&self, frame: &dyn TraceFrame) -> Locals {
        let mut locals = Locals::new();
        frame.visit_locals(&mut |name, value| {
            locals.insert(name.to_string(), self.renderer.render(value));
        });
        locals
    }

    fn site(frame: &dyn TraceFrame) -> Site {
        Site::new(
            frame.function_name(),
            frame.source_file(),
            frame.line_number(),
        )
    }

    fn append(
        &mut self,
        kind: EventKind,
        node_id: NodeId,
        frame: &dyn TraceFrame,
        locals: Locals,
        detail: Option<String>,
    ) -> EventId {
        let id = self.event_ids.next_event();
        self.log.push(Event::unchecked(
            id,
            kind,
            node_id,
            Self::site(frame),
            locals,
            detail,
        ));
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut CallNode> {
        let index = *self.node_index.get(&id)?;
        self.nodes.get_mut(index)
    }

    fn on_call(&mut self, frame: &dyn TraceFrame) {
        let node_id = self.node_ids.next_node();
        if let Some(&parent) = self.stack.last() {
            self.edges.push(CallEdge::new(parent, node_id));
        }

        let args = self.snapshot_locals(frame);
        let call_event_id = self.append(EventKind::Call, node_id, frame, args.clone(), None);

        self.node_index.insert(node_id, self.nodes.len());
        self.nodes.push(CallNode::open(
            node_id,
            frame.function_name().to_string(),
            frame.source_file().to_string(),
            call_event_id,
            args,
        ));
        self.stack.push(node_id);
    }

    fn on_line(&mut self, node_id: NodeId, frame: &dyn TraceFrame) {
        let locals = self.snapshot_locals(frame);
        self.append(EventKind::Line, node_id, frame, locals, None);
    }

    fn on_return(&mut self, node_id: NodeId, frame: &dyn TraceFrame, value: &dyn std::fmt::Display) {
        let rendered = self.renderer.render(value);
        let locals = self.snapshot_locals(frame);
        let event_id = self.append(
            EventKind::Return,
            node_id,
            frame,
            locals,
            Some(rendered.clone()),
        );
        let completed = self
            .node_mut(node_id)
            .is_some_and(|node| node.complete_return(event_id, rendered));
        if !completed {
            trace!(node = %node_id, "return after completion; node left unchanged");
        }
        self.stack.pop();
    }

    fn on_exception(&mut self, node_id: NodeId, frame: &dyn TraceFrame, description: String) {
        let locals = self.snapshot_locals(frame);
        self.append(
            EventKind::Exception,
            node_id,
            frame,
            locals,
            Some(description.clone()),
        );
        if let Some(node) = self.node_mut(node_id) {
            node.complete_exception(description);
        }
    }
}

impl TraceHook for TraceRecorder {
    fn on_event(&mut self, frame: &dyn TraceFrame, event: TraceEvent<'_>) {
        if frame.source_file() != self.traced_file {
            return;
        }

        if let TraceEvent::Call = event {
            self.on_call(frame);
            return;
        }

        let Some(&node_id) = self.stack.last() else {
            trace!(?event, "no open call node; notification dropped");
            return;
        };

        match event {
            TraceEvent::Call => {}
            TraceEvent::Line => self.on_line(node_id, frame),
            TraceEvent::Return(value) => self.on_return(node_id, frame, value),
            TraceEvent::Exception(info) => self.on_exception(node_id, frame, info.to_string()),
        }
    }
}
