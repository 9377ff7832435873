//! Event log entries.
//!
//! An [`Event`] is one instantaneous occurrence reported by the instrumented
//! runtime: a function was entered, a line is about to execute, a function
//! returned, or an exception passed through a frame. Events are created once,
//! appended to the log and never changed afterwards, so all fields are
//! read-only through accessors.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::id::{EventId, NodeId};

/// Rendered local variable bindings: name to rendered value.
///
/// Keeps the order in which the runtime reported the bindings. Equality
/// ignores that order.
pub type Locals = IndexMap<String, String>;

/// Kind of a recorded occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Call,
    Line,
    Return,
    Exception,
}

impl EventKind {
    /// Returns `true` for the kinds that carry a detail string.
    pub fn has_detail(self) -> bool {
        matches!(self, EventKind::Return | EventKind::Exception)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Call => "call",
            EventKind::Line => "line",
            EventKind::Return => "return",
            EventKind::Exception => "exception",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an event happened: function, file and line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub function_name: String,
    pub source_file: String,
    pub line_number: u32,
}

impl Site {
    pub fn new(
        function_name: impl Into<String>,
        source_file: impl Into<String>,
        line_number: u32,
    ) -> Self {
        Site {
            function_name: function_name.into(),
            source_file: source_file.into(),
            line_number,
        }
    }
}

/// One entry of the event log.
///
/// Serialized field names follow the trace JSON format consumed by external
/// writers and viewers (`type`, `func_name`, `filename`, `lineno`, `arg`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    #[serde(rename = "type")]
    kind: EventKind,
    node_id: NodeId,
    #[serde(rename = "func_name")]
    function_name: String,
    #[serde(rename = "filename")]
    source_file: String,
    #[serde(rename = "lineno")]
    line_number: u32,
    #[serde(default)]
    locals: Locals,
    /// Rendered return value or `"<Type>: <message>"`.
    #[serde(rename = "arg", default)]
    detail: Option<String>,
}

impl Event {
    /// Creates a validated event.
    pub fn new(
        id: EventId,
        kind: EventKind,
        node_id: NodeId,
        site: Site,
        locals: Locals,
        detail: Option<String>,
    ) -> Result<Self, ModelError> {
        let event = Event::unchecked(id, kind, node_id, site, locals, detail);
        event.validate()?;
        Ok(event)
    }

    /// Builds an event whose invariants the caller already guarantees.
    pub(crate) fn unchecked(
        id: EventId,
        kind: EventKind,
        node_id: NodeId,
        site: Site,
        locals: Locals,
        detail: Option<String>,
    ) -> Self {
        let Site {
            function_name,
            source_file,
            line_number,
        } = site;
        Event {
            id,
            kind,
            node_id,
            function_name,
            source_file,
            line_number,
            locals,
            detail,
        }
    }

    pub fn call(id: EventId, node_id: NodeId, site: Site, locals: Locals) -> Result<Self, ModelError> {
        Event::new(id, EventKind::Call, node_id, site, locals, None)
    }

    pub fn line(id: EventId, node_id: NodeId, site: Site, locals: Locals) -> Result<Self, ModelError> {
        Event::new(id, EventKind::Line, node_id, site, locals, None)
    }

    pub fn return_(
        id: EventId,
        node_id: NodeId,
        site: Site,
        locals: Locals,
        return_value: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Event::new(id, EventKind::Return, node_id, site, locals, Some(return_value.into()))
    }

    pub fn exception(
        id: EventId,
        node_id: NodeId,
        site: Site,
        locals: Locals,
        exception_info: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Event::new(
            id,
            EventKind::Exception,
            node_id,
            site,
            locals,
            Some(exception_info.into()),
        )
    }

    /// Checks the record-level invariants.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.id.is_valid() {
            return Err(ModelError::InvalidEventId { id: self.id });
        }
        if !self.node_id.is_valid() {
            return Err(ModelError::InvalidNodeId { id: self.node_id });
        }
        if self.function_name.is_empty() {
            return Err(ModelError::EmptyFunctionName);
        }
        if self.source_file.is_empty() {
            return Err(ModelError::EmptySourceFile);
        }
        if self.detail.is_some() && !self.kind.has_detail() {
            return Err(ModelError::UnexpectedDetail { kind: self.kind });
        }
        Ok(())
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn is_call(&self) -> bool {
        self.kind == EventKind::Call
    }

    pub fn is_line(&self) -> bool {
        self.kind == EventKind::Line
    }

    pub fn is_return(&self) -> bool {
        self.kind == EventKind::Return
    }

    pub fn is_exception(&self) -> bool {
        self.kind == EventKind::Exception
    }

    /// The rendered return value, for `return` events only.
    pub fn return_value(&self) -> Option<&str> {
        if self.is_return() {
            self.detail()
        } else {
            None
        }
    }

    /// The `"<Type>: <message>"` description, for `exception` events only.
    pub fn exception_info(&self) -> Option<&str> {
        if self.is_exception() {
            self.detail()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Site {
        Site::new("test_func", "test.flow", 10)
    }

    fn locals(pairs: &[(&str, &str)]) -> Locals {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn create_valid_call_event() {
        let event = Event::call(EventId(1), NodeId(1), site(), locals(&[("x", "5")])).unwrap();
        assert_eq!(event.id(), EventId(1));
        assert_eq!(event.kind(), EventKind::Call);
        assert_eq!(event.node_id(), NodeId(1));
        assert_eq!(event.function_name(), "test_func");
        assert_eq!(event.source_file(), "test.flow");
        assert_eq!(event.line_number(), 10);
        assert_eq!(event.locals().get("x").map(String::as_str), Some("5"));
        assert_eq!(event.detail(), None);
    }

    #[test]
    fn zero_event_id_is_rejected() {
        let err = Event::call(EventId(0), NodeId(1), site(), Locals::new()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidEventId { .. }));
        assert_eq!(err.to_string(), "event ID must be positive, got 0");
    }

    #[test]
    fn zero_node_id_is_rejected() {
        let err = Event::line(EventId(1), NodeId(0), site(), Locals::new()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidNodeId { .. }));
    }

    #[test]
    fn empty_names_are_rejected() {
        let err = Event::call(EventId(1), NodeId(1), Site::new("", "f.flow", 1), Locals::new())
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptyFunctionName));

        let err = Event::call(EventId(1), NodeId(1), Site::new("f", "", 1), Locals::new())
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptySourceFile));
    }

    #[test]
    fn detail_only_on_return_and_exception() {
        let err = Event::new(
            EventId(1),
            EventKind::Line,
            NodeId(1),
            site(),
            Locals::new(),
            Some("42".into()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnexpectedDetail {
                kind: EventKind::Line
            }
        ));
    }

    #[test]
    fn detail_accessors_respect_kind() {
        let ret = Event::return_(EventId(2), NodeId(1), site(), Locals::new(), "42").unwrap();
        assert_eq!(ret.return_value(), Some("42"));
        assert_eq!(ret.exception_info(), None);
        assert!(ret.is_return());

        let exc = Event::exception(EventId(3), NodeId(1), site(), Locals::new(), "TypeError: bad")
            .unwrap();
        assert_eq!(exc.exception_info(), Some("TypeError: bad"));
        assert_eq!(exc.return_value(), None);
        assert!(exc.is_exception() && !exc.is_call());
    }

    #[test]
    fn serializes_with_trace_format_names() {
        let event = Event::return_(EventId(4), NodeId(2), site(), locals(&[("n", "3")]), "6")
            .unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "return");
        assert_eq!(json["func_name"], "test_func");
        assert_eq!(json["filename"], "test.flow");
        assert_eq!(json["lineno"], 10);
        assert_eq!(json["node_id"], 2);
        assert_eq!(json["arg"], "6");
        assert_eq!(json["locals"]["n"], "3");
    }

    #[test]
    fn locals_equality_ignores_order() {
        let a = locals(&[("a", "1"), ("b", "2")]);
        let b = locals(&[("b", "2"), ("a", "1")]);
        assert_eq!(a, b);
    }
}
