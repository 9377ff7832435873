//! Validation errors for the trace data model.
//!
//! The recorder never produces these for its own output; they guard the
//! public constructors and the mapping deserializer, where data comes from
//! outside the crate.

use thiserror::Error;

use crate::event::EventKind;
use crate::id::{EventId, NodeId};

/// Errors produced when constructing or reconstructing trace records.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Event ids are allocated from 1.
    #[error("event ID must be positive, got {id}")]
    InvalidEventId { id: EventId },

    /// Node ids are allocated from 1.
    #[error("node ID must be positive, got {id}")]
    InvalidNodeId { id: NodeId },

    #[error("function name cannot be empty")]
    EmptyFunctionName,

    #[error("filename cannot be empty")]
    EmptySourceFile,

    /// Only `return` and `exception` events carry a detail string.
    #[error("{kind} event cannot carry a detail value")]
    UnexpectedDetail { kind: EventKind },

    /// A node was reconstructed with both completion fields set.
    #[error("call node {id} has both a return value and an exception")]
    ConflictingCompletion { id: NodeId },

    /// `error` must be set exactly when the status is `runtime_error`.
    #[error("status {status} does not match error presence (error set: {has_error})")]
    StatusErrorMismatch { status: &'static str, has_error: bool },

    #[error("edge {parent} -> {child} refers to a node that does not exist")]
    DanglingEdge { parent: NodeId, child: NodeId },

    #[error("call node {id} has more than one parent")]
    MultipleParents { id: NodeId },

    /// Following parent links from this node never reaches a root.
    #[error("call edges form a cycle through node {id}")]
    CyclicEdges { id: NodeId },

    /// The mapping handed to `RunResult::from_mapping` did not have the
    /// expected shape.
    #[error("malformed run result mapping: {0}")]
    Mapping(#[from] serde_json::Error),
}
