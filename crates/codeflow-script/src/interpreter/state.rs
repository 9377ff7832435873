//! Namespaces and call frames.
//!
//! A [`Frame`] is one activation on the interpreter's call stack. Function
//! frames own their locals; the `<module>` frame has none of its own and
//! reads and writes the unit's [`Environment`] instead, so a snapshot of the
//! module frame shows the unit's globals.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use codeflow_core::TraceFrame;

use crate::value::{Function, Scope, Value};

/// Function name of the frame that runs a unit's top-level code.
pub const MODULE_FRAME: &str = "<module>";

/// A namespace of name bindings, in definition order.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: IndexMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Fresh globals for running `file` as the main unit.
    pub fn for_unit(file: &str) -> Self {
        let mut env = Environment::new();
        env.set("__name__", Value::str("__main__"));
        env.set("__file__", Value::str(file));
        env
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.vars.get_mut(name) {
            *slot = value;
        } else {
            self.vars.insert(name.to_string(), value);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Result of executing a statement.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// One activation on the call stack.
#[derive(Debug)]
pub(crate) struct Frame {
    pub function: Rc<str>,
    pub file: Rc<str>,
    pub line: u32,
    pub scope: Scope,
    /// `None` for the module frame, whose locals are the globals.
    pub locals: Option<IndexMap<String, Value>>,
}

impl Frame {
    pub fn module(file: Rc<str>) -> Self {
        Frame {
            function: Rc::from(MODULE_FRAME),
            file,
            line: 0,
            scope: Scope::Unit,
            locals: None,
        }
    }

    pub fn call(function: &Function, locals: IndexMap<String, Value>) -> Self {
        Frame {
            function: Rc::clone(&function.name),
            file: Rc::clone(&function.file),
            line: function.def.line,
            scope: function.scope,
            locals: Some(locals),
        }
    }
}

/// What a hook sees of a frame.
pub(crate) struct FrameView<'a> {
    pub frame: &'a Frame,
    pub globals: &'a Environment,
}

impl TraceFrame for FrameView<'_> {
    fn function_name(&self) -> &str {
        &self.frame.function
    }

    fn source_file(&self) -> &str {
        &self.frame.file
    }

    fn line_number(&self) -> u32 {
        self.frame.line
    }

    fn visit_locals(&self, visit: &mut dyn FnMut(&str, &dyn fmt::Display)) {
        match &self.frame.locals {
            Some(locals) => {
                for (name, value) in locals {
                    visit(name, value);
                }
            }
            None => {
                for (name, value) in self.globals.iter() {
                    visit(name, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_environment_has_dunder_names() {
        let env = Environment::for_unit("demo.flow");
        let names: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["__name__", "__file__"]);
        assert_eq!(env.get("__file__").map(Value::str_form).as_deref(), Some("demo.flow"));
    }

    #[test]
    fn set_keeps_definition_order() {
        let mut env = Environment::new();
        env.set("b", Value::Int(1));
        env.set("a", Value::Int(2));
        env.set("b", Value::Int(3));
        let seen: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        assert_eq!(seen, vec!["b=3", "a=2"]);
    }

    #[test]
    fn module_frame_view_reads_globals() {
        let mut globals = Environment::new();
        globals.set("x", Value::Int(5));
        let frame = Frame::module(Rc::from("m.flow"));
        let view = FrameView {
            frame: &frame,
            globals: &globals,
        };
        let mut seen = Vec::new();
        view.visit_locals(&mut |name, value| seen.push(format!("{name}={value}")));
        assert_eq!(seen, vec!["x=5"]);
        assert_eq!(view.function_name(), MODULE_FRAME);
        assert_eq!(view.line_number(), 0);
    }
}
