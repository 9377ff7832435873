//! End-to-end recorder scenarios with snapshot-checked trace dumps.

use std::fmt::{self, Write};

use codeflow_core::{
    CallNode, ExceptionInfo, NodeId, RecordedTrace, RunResult, RunStatus, TraceEvent, TraceFrame,
    TraceHook, TraceRecorder, ValueRenderer,
};

const FILE: &str = "scenario.flow";

struct Frame<'a> {
    function: &'a str,
    line: u32,
    locals: &'a [(&'a str, &'a str)],
}

impl TraceFrame for Frame<'_> {
    fn function_name(&self) -> &str {
        self.function
    }

    fn source_file(&self) -> &str {
        FILE
    }

    fn line_number(&self) -> u32 {
        self.line
    }

    fn visit_locals(&self, visit: &mut dyn FnMut(&str, &dyn fmt::Display)) {
        for (name, value) in self.locals {
            visit(name, value);
        }
    }
}

fn frame<'a>(function: &'a str, line: u32, locals: &'a [(&'a str, &'a str)]) -> Frame<'a> {
    Frame {
        function,
        line,
        locals,
    }
}

fn dump(trace: &RecordedTrace) -> String {
    let mut out = String::new();
    for ev in &trace.events {
        let locals: Vec<String> = ev.locals().iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(
            out,
            "#{} {} node={} {}:{} {{{}}}",
            ev.id(),
            ev.kind(),
            ev.node_id(),
            ev.function_name(),
            ev.line_number(),
            locals.join(", ")
        )
        .unwrap();
        if let Some(detail) = ev.detail() {
            write!(out, " -> {detail}").unwrap();
        }
        out.push('\n');
    }
    for node in &trace.nodes {
        write!(out, "node {} {}", node.id(), node.function_name()).unwrap();
        if let Some(ret) = node.return_value() {
            write!(out, " ret={ret}").unwrap();
        }
        if let Some(exc) = node.exception_info() {
            write!(out, " exc={exc}").unwrap();
        }
        out.push('\n');
    }
    for edge in &trace.edges {
        writeln!(out, "edge {} -> {}", edge.parent_id, edge.child_id).unwrap();
    }
    out
}

#[test]
fn single_function_call() {
    let mut rec = TraceRecorder::new(FILE, ValueRenderer::default());
    rec.on_event(&frame("f", 1, &[("n", "2")]), TraceEvent::Call);
    rec.on_event(&frame("f", 2, &[("n", "2")]), TraceEvent::Line);
    rec.on_event(&frame("f", 3, &[("n", "2"), ("x", "3")]), TraceEvent::Line);
    rec.on_event(
        &frame("f", 3, &[("n", "2"), ("x", "3")]),
        TraceEvent::Return(&3),
    );
    let trace = rec.finish();

    assert_eq!(trace.nodes.len(), 1);
    assert!(trace.edges.is_empty());
    insta::assert_snapshot!(dump(&trace), @r"
    #1 call node=1 f:1 {n=2}
    #2 line node=1 f:2 {n=2}
    #3 line node=1 f:3 {n=2, x=3}
    #4 return node=1 f:3 {n=2, x=3} -> 3
    node 1 f ret=3
    ");
}

#[test]
fn double_recursive_descent() {
    let mut rec = TraceRecorder::new(FILE, ValueRenderer::default());
    rec.on_event(&frame("down", 1, &[("n", "2")]), TraceEvent::Call);
    rec.on_event(&frame("down", 1, &[("n", "1")]), TraceEvent::Call);
    rec.on_event(&frame("down", 1, &[("n", "0")]), TraceEvent::Call);
    rec.on_event(&frame("down", 2, &[("n", "0")]), TraceEvent::Return(&0));
    rec.on_event(&frame("down", 3, &[("n", "1")]), TraceEvent::Return(&1));
    rec.on_event(&frame("down", 3, &[("n", "2")]), TraceEvent::Return(&2));
    let trace = rec.finish();

    assert_eq!(trace.nodes.len(), 3);
    assert_eq!(trace.edges.len(), 2);
    insta::assert_snapshot!(dump(&trace), @r"
    #1 call node=1 down:1 {n=2}
    #2 call node=2 down:1 {n=1}
    #3 call node=3 down:1 {n=0}
    #4 return node=3 down:2 {n=0} -> 0
    #5 return node=2 down:3 {n=1} -> 1
    #6 return node=1 down:3 {n=2} -> 2
    node 1 down ret=2
    node 2 down ret=1
    node 3 down ret=0
    edge 1 -> 2
    edge 2 -> 3
    ");
}

#[test]
fn raising_function_keeps_partial_trace() {
    let mut rec = TraceRecorder::new(FILE, ValueRenderer::default());
    let info = ExceptionInfo::new("ValueError", "negative input");
    rec.on_event(&frame("<module>", 0, &[]), TraceEvent::Call);
    rec.on_event(&frame("<module>", 4, &[]), TraceEvent::Line);
    rec.on_event(&frame("check", 1, &[("x", "-1")]), TraceEvent::Call);
    rec.on_event(&frame("check", 2, &[("x", "-1")]), TraceEvent::Line);
    rec.on_event(&frame("check", 2, &[("x", "-1")]), TraceEvent::Exception(&info));
    let trace = rec.finish();

    let check: &CallNode = &trace.nodes[1];
    assert_eq!(check.exception_info(), Some("ValueError: negative input"));
    assert_eq!(check.return_value(), None);
    assert!(trace.nodes[0].is_abandoned());

    let result = RunResult::runtime_error(trace, "ValueError: negative input".into(), vec![]);
    assert_eq!(result.status(), RunStatus::RuntimeError);
    assert!(!result.error().unwrap_or_default().is_empty());
    assert_eq!(result.events().len(), 5);
    assert_eq!(result.children_of(NodeId(1)).collect::<Vec<_>>(), vec![NodeId(2)]);
}

#[test]
fn oversized_value_is_truncated_to_limit_plus_marker() {
    let long = "z".repeat(500);
    let mut rec = TraceRecorder::new(FILE, ValueRenderer::new(200));
    rec.on_event(&frame("f", 1, &[("blob", long.as_str())]), TraceEvent::Call);
    let rendered = rec.events()[0].locals()["blob"].clone();
    assert_eq!(rendered.chars().count(), 201);
    assert!(rendered.ends_with(ValueRenderer::TRUNCATION_MARKER));
    assert!(rendered.starts_with(&"z".repeat(200)));
}
