//! Identifier newtypes for recorded trace entities.
//!
//! Events and call nodes live in separate id spaces. Both are distinct
//! newtype wrappers over `u64` so that an `EventId` cannot be passed where a
//! `NodeId` is expected. Ids are allocated from 1; zero is never issued.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one entry in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

/// Identifier of one call node (one function invocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl EventId {
    /// Returns `true` for ids the recorder could have issued.
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl NodeId {
    /// Returns `true` for ids the recorder could have issued.
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id allocator. Each id space owns its own counter.
///
/// The first id handed out is 1.
#[derive(Debug, Default, Clone)]
pub(crate) struct IdCounter(u64);

impl IdCounter {
    pub(crate) fn next_event(&mut self) -> EventId {
        self.0 += 1;
        EventId(self.0)
    }

    pub(crate) fn next_node(&mut self) -> NodeId {
        self.0 += 1;
        NodeId(self.0)
    }
}
