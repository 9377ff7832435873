//! Event recording and call-tree construction for traced program runs.
//!
//! An instrumented runtime reports every call, line step, return and
//! exception through the [`hook`] contract. The [`recorder::TraceRecorder`]
//! filters those notifications to one source file and turns them into an
//! append-only event log ([`event::Event`]), a call tree
//! ([`node::CallNode`], [`node::CallEdge`]) and bounded value snapshots
//! ([`render::ValueRenderer`]). A finished run is packaged as a
//! [`result::RunResult`], which converts to and from a plain mapping for
//! external writers.

pub mod error;
pub mod event;
pub mod graph;
pub mod hook;
pub mod id;
pub mod node;
pub mod recorder;
pub mod render;
pub mod result;

// Re-export commonly used types
pub use error::ModelError;
pub use event::{Event, EventKind, Locals, Site};
pub use graph::CallGraph;
pub use hook::{ExceptionInfo, HookGuard, HookSlot, TraceEvent, TraceFrame, TraceHook};
pub use id::{EventId, NodeId};
pub use node::{CallEdge, CallNode, NodeStatus};
pub use recorder::{RecordedTrace, TraceRecorder};
pub use render::ValueRenderer;
pub use result::{RunResult, RunStatus, TraceSummary};
