//! Graphviz rendering of a run's call tree.

use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;

use codeflow_core::{CallNode, RunResult};
use codeflow_script::MODULE_FRAME;

/// Renders the call tree as a DOT digraph, one box per invocation.
///
/// The `<module>` node is left out unless `show_module` is set; its edges go
/// with it.
pub fn render(result: &RunResult, show_module: bool) -> String {
    let calls = result.call_graph();
    let graph: DiGraph<String, ()> = calls.graph().filter_map(
        |_, id| {
            let node = result.node(*id)?;
            (show_module || node.function_name() != MODULE_FRAME).then(|| label(node))
        },
        |_, _| Some(()),
    );

    let dot = Dot::with_attr_getters(
        &graph,
        &[Config::NodeNoLabel, Config::EdgeNoLabel],
        &|_, _| String::new(),
        &|_, (_, text)| format!("label=\"{}\" shape=box", escape(text)),
    );
    format!("{dot:?}")
}

/// `func #id`, the arguments, then the outcome, one per line.
pub fn label(node: &CallNode) -> String {
    let mut lines = vec![format!("{}\n#{}", node.function_name(), node.id())];
    if !node.args().is_empty() {
        let args: Vec<String> = node.args().iter().map(|(k, v)| format!("{k}={v}")).collect();
        lines.push(format!("({})", args.join(", ")));
    }
    if let Some(exc) = node.exception_info() {
        lines.push(format!("EXC: {exc}"));
    } else if let Some(ret) = node.return_value() {
        lines.push(format!("ret={ret}"));
    }
    lines.join("\n")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeflow_runner::Runner;

    fn run(source: &str) -> RunResult {
        Runner::default().run(source, "g.flow").unwrap()
    }

    #[test]
    fn labels_show_args_and_outcome() {
        let result = run("def add(a, b):\n    return a + b\nadd(1, 2)\n");
        let node = &result.nodes()[1];
        assert_eq!(label(node), "add\n#2\n(a=1, b=2)\nret=3");
    }

    #[test]
    fn raised_nodes_show_exception() {
        let result = run("def f():\n    raise ValueError('no')\nf()\n");
        assert_eq!(label(&result.nodes()[1]), "f\n#2\nEXC: ValueError: no");
    }

    #[test]
    fn module_hidden_by_default() {
        let result = run("def f():\n    return 1\nf()\nf()\n");
        let hidden = render(&result, false);
        assert!(!hidden.contains("<module>"));
        assert_eq!(hidden.matches("shape=box").count(), 2);
        assert!(!hidden.contains("->"));

        let shown = render(&result, true);
        assert!(shown.contains("<module>"));
        assert_eq!(shown.matches("->").count(), 2);
    }

    #[test]
    fn quotes_are_escaped() {
        let result = run("def echo(s):\n    return s\necho('say \"hi\"')\n");
        let dot = render(&result, false);
        assert!(dot.contains(r#"(s='say \"hi\"')"#));
    }
}
