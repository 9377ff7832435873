//! Library functions written in the script language itself.
//!
//! They are defined under their own source file name, so a recorder
//! filtering on the traced unit never sees their frames.

use std::rc::Rc;

use crate::ast::StmtKind;
use crate::parser::parse;
use crate::value::{Function, Scope, Value};

use super::state::Environment;

/// File name prelude functions report in their frames.
pub const PRELUDE_FILE: &str = "<prelude>";

pub(crate) const PRELUDE_SOURCE: &str = r#"
def sum(items):
    total = 0
    for item in items:
        total = total + item
    return total

def any(items):
    for item in items:
        if item:
            return True
    return False

def all(items):
    for item in items:
        if not item:
            return False
    return True
"#;

/// Builds the prelude namespace.
pub(crate) fn load() -> Environment {
    let mut env = Environment::new();
    let file: Rc<str> = Rc::from(PRELUDE_FILE);
    let module = parse(PRELUDE_SOURCE).unwrap_or_default();
    for stmt in &module.body {
        if let StmtKind::FunctionDef(def) = &stmt.kind {
            let function = Function::new(Rc::clone(def), Rc::clone(&file), Scope::Prelude);
            env.set(&def.name, Value::Function(Rc::new(function)));
        }
    }
    env
}
