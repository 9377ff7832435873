//! An instrumented runtime for a small indentation-based scripting language.
//!
//! The language is a Python subset: functions, `if`/`elif`/`else`, `while`,
//! `for ... in`, integers, floats, strings, lists and exceptions. Running a
//! [`Module`] through the [`Interpreter`] reports every frame entry, line,
//! return and exception to the hook installed in a
//! [`codeflow_core::HookSlot`], which is how the trace recorder observes it.
//!
//! ```text
//! source --lexer--> tokens --parser--> Module --Interpreter--> hook events
//! ```

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::Module;
pub use error::{ParseError, Raised, TracebackEntry};
pub use interpreter::builtins::Builtin;
pub use interpreter::prelude::PRELUDE_FILE;
pub use interpreter::state::{Environment, MODULE_FRAME};
pub use interpreter::{Interpreter, InterpreterConfig};
pub use parser::parse;
pub use value::Value;
