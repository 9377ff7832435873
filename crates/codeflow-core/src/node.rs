//! Call tree records.
//!
//! A [`CallNode`] is one function invocation. It is created by a `call` event
//! and completed at most once, later, by the matching `return` or `exception`
//! event. A [`CallEdge`] links the invocation that was active when a call
//! happened to the invocation the call created.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::event::Locals;
use crate::id::{EventId, NodeId};

/// Completion state of a call node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// No completion recorded. After a finished run this means the
    /// invocation was abandoned.
    Open,
    Returned,
    Raised,
}

/// One function invocation in the call tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallNode {
    id: NodeId,
    #[serde(rename = "func_name")]
    function_name: String,
    #[serde(rename = "filename")]
    source_file: String,
    call_event_id: EventId,
    /// Arguments as bound at call time.
    #[serde(default)]
    args: Locals,
    #[serde(default)]
    return_event_id: Option<EventId>,
    #[serde(default)]
    return_value: Option<String>,
    #[serde(rename = "exception", default)]
    exception_info: Option<String>,
}

impl CallNode {
    /// Creates an open node.
    pub fn new(
        id: NodeId,
        function_name: impl Into<String>,
        source_file: impl Into<String>,
        call_event_id: EventId,
        args: Locals,
    ) -> Result<Self, ModelError> {
        let node = CallNode {
            id,
            function_name: function_name.into(),
            source_file: source_file.into(),
            call_event_id,
            args,
            return_event_id: None,
            return_value: None,
            exception_info: None,
        };
        node.validate()?;
        Ok(node)
    }

    pub(crate) fn open(
        id: NodeId,
        function_name: String,
        source_file: String,
        call_event_id: EventId,
        args: Locals,
    ) -> Self {
        CallNode {
            id,
            function_name,
            source_file,
            call_event_id,
            args,
            return_event_id: None,
            return_value: None,
            exception_info: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.id.is_valid() {
            return Err(ModelError::InvalidNodeId { id: self.id });
        }
        if !self.call_event_id.is_valid() {
            return Err(ModelError::InvalidEventId {
                id: self.call_event_id,
            });
        }
        if self.function_name.is_empty() {
            return Err(ModelError::EmptyFunctionName);
        }
        if self.source_file.is_empty() {
            return Err(ModelError::EmptySourceFile);
        }
        if self.return_value.is_some() && self.exception_info.is_some() {
            return Err(ModelError::ConflictingCompletion { id: self.id });
        }
        Ok(())
    }

    /// Records a normal return. Returns `false` and leaves the node untouched
    /// if a completion was already recorded.
    pub(crate) fn complete_return(&mut self, event_id: EventId, value: String) -> bool {
        if self.status() != NodeStatus::Open {
            return false;
        }
        self.return_event_id = Some(event_id);
        self.return_value = Some(value);
        true
    }

    /// Records an exception. Same write-once rule as [`Self::complete_return`].
    pub(crate) fn complete_exception(&mut self, info: String) -> bool {
        if self.status() != NodeStatus::Open {
            return false;
        }
        self.exception_info = Some(info);
        true
    }

    pub fn status(&self) -> NodeStatus {
        if self.exception_info.is_some() {
            NodeStatus::Raised
        } else if self.return_value.is_some() {
            NodeStatus::Returned
        } else {
            NodeStatus::Open
        }
    }

    /// Returns `true` if the invocation never completed.
    pub fn is_abandoned(&self) -> bool {
        self.status() == NodeStatus::Open
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn call_event_id(&self) -> EventId {
        self.call_event_id
    }

    pub fn args(&self) -> &Locals {
        &self.args
    }

    pub fn return_event_id(&self) -> Option<EventId> {
        self.return_event_id
    }

    pub fn return_value(&self) -> Option<&str> {
        self.return_value.as_deref()
    }

    pub fn exception_info(&self) -> Option<&str> {
        self.exception_info.as_deref()
    }
}

/// Parent to child link between two call nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    pub parent_id: NodeId,
    pub child_id: NodeId,
}

impl CallEdge {
    pub fn new(parent_id: NodeId, child_id: NodeId) -> Self {
        CallEdge {
            parent_id,
            child_id,
        }
    }
}
