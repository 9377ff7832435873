//! Whole runs: source in, `RunResult` out.

use std::fmt::Write;
use std::io::Write as _;

use codeflow_core::{NodeStatus, RunResult, RunStatus};
use codeflow_runner::{RunError, Runner, RunnerConfig};

const KNAPSACK: &str = include_str!("../../../demos/knapsack.flow");
const FAILING: &str = include_str!("../../../demos/failing.flow");

fn dump(result: &RunResult) -> String {
    let mut out = String::new();
    for ev in result.events() {
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
    for node in result.nodes() {
        write!(out, "node {} {}", node.id(), node.function_name()).unwrap();
        if let Some(ret) = node.return_value() {
            write!(out, " ret={ret}").unwrap();
        }
        if let Some(exc) = node.exception_info() {
            write!(out, " exc={exc}").unwrap();
        }
        out.push('\n');
    }
    for edge in result.edges() {
        writeln!(out, "edge {} -> {}", edge.parent_id, edge.child_id).unwrap();
    }
    out
}

#[test]
fn single_call_full_trace() {
    let source = "def f(n):\n    x = n + 1\n    return x\nf(2)\n";
    let result = Runner::default().run(source, "a.flow").unwrap();
    assert_eq!(result.status(), RunStatus::Ok);
    assert_eq!(result.error(), None);
    insta::assert_snapshot!(dump(&result), @r"
    #1 call node=1 <module>:0 {__name__='__main__', __file__='a.flow'}
    #2 line node=1 <module>:1 {__name__='__main__', __file__='a.flow'}
    #3 line node=1 <module>:4 {__name__='__main__', __file__='a.flow', f=<function f>}
    #4 call node=2 f:1 {n=2}
    #5 line node=2 f:2 {n=2}
    #6 line node=2 f:3 {n=2, x=3}
    #7 return node=2 f:3 {n=2, x=3} -> 3
    #8 return node=1 <module>:4 {__name__='__main__', __file__='a.flow', f=<function f>} -> None
    node 1 <module> ret=None
    node 2 f ret=3
    edge 1 -> 2
    ");
}

#[test]
fn knapsack_call_tree() {
    let result = Runner::default().run(KNAPSACK, "knapsack.flow").unwrap();
    assert!(result.is_ok());
    assert_eq!(result.output(), ["Knapsack naive = 7"]);

    let summary = result.summary();
    // The module frame plus 13 calls to `knap`.
    assert_eq!(summary.nodes, 14);
    assert_eq!(summary.edges, 13);
    assert_eq!(summary.calls, 14);
    assert_eq!(summary.returns, 14);
    assert_eq!(summary.exceptions, 0);
    assert_eq!(summary.abandoned, 0);
    assert_eq!(summary.max_depth, 6);

    let root = result.roots().next().expect("module node");
    assert_eq!(root.function_name(), "<module>");
    let top: Vec<_> = result.children_of(root.id()).collect();
    assert_eq!(top.len(), 1);
    let knap = result.node(top[0]).unwrap();
    assert_eq!(knap.args()["i"], "3");
    assert_eq!(knap.args()["capacity"], "5");
    assert_eq!(knap.return_value(), Some("7"));
    assert!(result.nodes().iter().all(|n| n.status() == NodeStatus::Returned));
}

#[test]
fn failing_run_keeps_partial_trace() {
    let result = Runner::default().run(FAILING, "failing.flow").unwrap();
    assert_eq!(result.status(), RunStatus::RuntimeError);
    insta::assert_snapshot!(result.error().unwrap(), @r#"
    Traceback (most recent call last):
      File "failing.flow", line 13, in <module>
        print(load(["31", "7", "-2", "40"]))
      File "failing.flow", line 10, in load
        ages = ages + [parse_age(row)]
      File "failing.flow", line 4, in parse_age
        raise ValueError("age must be non-negative")
    ValueError: age must be non-negative
    "#);

    let names: Vec<&str> = result.nodes().iter().map(|n| n.function_name()).collect();
    assert_eq!(names, ["<module>", "load", "parse_age", "parse_age", "parse_age"]);
    let raised: Vec<&str> = result
        .nodes()
        .iter()
        .filter(|n| n.status() == NodeStatus::Raised)
        .map(|n| n.function_name())
        .collect();
    assert_eq!(raised, ["<module>", "load", "parse_age"]);
    let failed = &result.nodes()[4];
    assert_eq!(failed.args()["text"], "'-2'");
    assert_eq!(failed.exception_info(), Some("ValueError: age must be non-negative"));
    assert_eq!(failed.return_value(), None);
    assert!(result.output().is_empty());
}

#[test]
fn prelude_calls_are_filtered_out() {
    let result = Runner::default()
        .run("total = sum([1, 2, 3])\nok = all([total])\n", "p.flow")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(result.nodes().len(), 1);
    assert!(result.events().iter().all(|e| e.source_file() == "p.flow"));
    let last = result.events().last().unwrap();
    assert_eq!(last.locals()["total"], "6");
    assert_eq!(last.locals()["ok"], "True");
}

#[test]
fn syntax_error_is_a_unit_failure() {
    let result = Runner::default().run("def f(:\n    pass\n", "bad.flow").unwrap();
    assert_eq!(result.status(), RunStatus::RuntimeError);
    assert_eq!(
        result.error(),
        Some("SyntaxError: expected a name, found ':' (bad.flow, line 1)")
    );
    assert!(result.events().is_empty());
    assert!(result.nodes().is_empty());
}

#[test]
fn recursion_limit_produces_bounded_traceback() {
    let result = Runner::default()
        .run("def down(n):\n    return down(n + 1)\ndown(0)\n", "deep.flow")
        .unwrap();
    let error = result.error().unwrap();
    assert!(error.ends_with("RecursionError: maximum recursion depth exceeded"));
    assert_eq!(error.matches("  File ").count(), 20);

    let summary = result.summary();
    assert_eq!(summary.nodes, 256);
    assert_eq!(summary.max_depth, 256);
    assert!(result.nodes().iter().all(|n| n.status() == NodeStatus::Raised));
}

#[test]
fn comparing_self_containing_lists_fails_the_unit() {
    let source = "a = [0]\na[0] = a\nb = [0]\nb[0] = b\nc = a == b\n";
    let result = Runner::default().run(source, "c.flow").unwrap();
    assert_eq!(result.status(), RunStatus::RuntimeError);
    let error = result.error().unwrap();
    assert!(error.contains("File \"c.flow\", line 5, in <module>"));
    assert!(error.ends_with("RecursionError: maximum recursion depth exceeded in comparison"));
    assert_eq!(result.nodes()[0].status(), NodeStatus::Raised);
}

#[test]
fn renderer_limit_comes_from_config() {
    let runner = Runner::new(RunnerConfig {
        max_repr_len: 10,
        ..RunnerConfig::default()
    });
    let result = runner
        .run("def f(s):\n    return s\nf('abcdefghijklmnop')\n", "r.flow")
        .unwrap();
    let f = &result.nodes()[1];
    assert_eq!(f.args()["s"], "'abcdefghi…");
    assert_eq!(f.return_value(), Some("'abcdefghi…"));
}

#[test]
fn runs_are_independent() {
    let runner = Runner::default();
    let first = runner.run("def f():\n    return 1\nf()\n", "one.flow").unwrap();
    let second = runner.run("def g():\n    return 2\ng()\n", "two.flow").unwrap();
    assert_eq!(first.events()[0].id().0, 1);
    assert_eq!(second.events()[0].id().0, 1);
    assert!(second.nodes().iter().all(|n| n.function_name() != "f"));
}

#[test]
fn run_file_uses_path_as_display_name() {
    let mut file = tempfile::Builder::new().suffix(".flow").tempfile().unwrap();
    writeln!(file, "def twice(x):\n    return x * 2\ny = twice(21)").unwrap();
    let path = file.path().to_path_buf();

    let result = Runner::default().run_file(&path).unwrap();
    assert!(result.is_ok());
    let name = path.to_string_lossy();
    assert!(result.events().iter().all(|e| e.source_file() == name));
    assert_eq!(result.nodes()[1].return_value(), Some("42"));
}

#[test]
fn unreadable_file_is_a_host_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.flow");
    let err = Runner::default().run_file(&missing).unwrap_err();
    match err {
        RunError::Read { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mapping_roundtrip_of_real_run() {
    let result = Runner::default().run(FAILING, "failing.flow").unwrap();
    let mapping = result.to_mapping();
    assert_eq!(mapping["status"], "runtime_error");
    assert_eq!(mapping["events"][0]["type"], "call");
    assert_eq!(mapping["nodes"][0]["func_name"], "<module>");
    assert_eq!(RunResult::from_mapping(mapping).unwrap(), result);
}
