//! Runtime values.
//!
//! `Display` on [`Value`] is the repr form (strings quoted, lists bracketed)
//! because that is what trace snapshots show. [`Value::str_form`] is the
//! form `print` and `str()` use.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use codeflow_core::ExceptionInfo;

use crate::ast::FunctionDef;
use crate::error::Raised;
use crate::interpreter::builtins::Builtin;

/// Which namespace a function resolves free names in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Defined by the traced unit; sees the unit's globals.
    Unit,
    /// Defined by the prelude; sees only prelude names and builtins.
    Prelude,
}

/// A user-defined function.
#[derive(Debug)]
pub struct Function {
    pub name: Rc<str>,
    pub def: Rc<FunctionDef>,
    /// Source unit the function was defined in.
    pub file: Rc<str>,
    pub scope: Scope,
}

impl Function {
    pub fn new(def: Rc<FunctionDef>, file: Rc<str>, scope: Scope) -> Self {
        Function {
            name: Rc::from(def.name.as_str()),
            def,
            file,
            scope,
        }
    }
}

pub type List = Rc<RefCell<Vec<Value>>>;

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(List),
    Function(Rc<Function>),
    Builtin(Builtin),
    /// An exception class such as `ValueError`; calling it builds an instance.
    ExceptionType(&'static str),
    Exception(Rc<ExceptionInfo>),
}

impl Value {
    pub fn str(text: &str) -> Value {
        Value::Str(Rc::from(text))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Python's name for the value's type, used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::ExceptionType(_) => "type",
            Value::Exception(info) => &info.type_name,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => items.try_borrow().map(|v| !v.is_empty()).unwrap_or(true),
            _ => true,
        }
    }

    /// Integer view of `int` and `bool` values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of any numeric value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            other => other.as_int().map(|i| i as f64),
        }
    }

    /// The text `print` and `str()` produce.
    pub fn str_form(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            Value::Exception(info) => info.message.clone(),
            other => other.to_string(),
        }
    }

    /// Python `==`. Fails only when nested lists are too deep (or cyclic)
    /// to compare.
    pub fn equals(&self, other: &Value) -> Result<bool, Raised> {
        let equal = match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let (Ok(a), Ok(b)) = (a.try_borrow(), b.try_borrow()) else {
                    return Ok(false);
                };
                if a.len() != b.len() {
                    return Ok(false);
                }
                return nested(|| {
                    for (x, y) in a.iter().zip(b.iter()) {
                        if !x.equals(y)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                });
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => x == y,
                _ => match (a.as_float(), b.as_float()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                },
            },
        };
        Ok(equal)
    }

    /// Python ordering for `<`, `max` and `min`. `Ok(None)` means the values
    /// are unordered (NaN).
    pub fn compare(&self, other: &Value, op: &str) -> Result<Option<Ordering>, Raised> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                let (Ok(a), Ok(b)) = (a.try_borrow(), b.try_borrow()) else {
                    return Err(Raised::new("RuntimeError", "list changed during comparison"));
                };
                nested(|| {
                    for (x, y) in a.iter().zip(b.iter()) {
                        if x.equals(y)? {
                            continue;
                        }
                        return x.compare(y, op);
                    }
                    Ok(Some(a.len().cmp(&b.len())))
                })
            }
            (a, b) => {
                if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
                    return Ok(Some(x.cmp(&y)));
                }
                if let (Some(x), Some(y)) = (a.as_float(), b.as_float()) {
                    return Ok(x.partial_cmp(&y));
                }
                Err(Raised::type_error(format!(
                    "'{op}' not supported between instances of '{}' and '{}'",
                    a.type_name(),
                    b.type_name()
                )))
            }
        }
    }
}

/// How many list levels `equals` and `compare` descend before giving up.
const MAX_COMPARE_DEPTH: usize = 500;

thread_local! {
    /// Lists currently being formatted, for cycle detection.
    static FORMATTING: RefCell<Vec<*const RefCell<Vec<Value>>>> = const { RefCell::new(Vec::new()) };

    /// List levels currently being compared.
    static COMPARE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Runs one level of a list comparison. Self-containing lists never bottom
/// out, so they hit the depth limit and raise.
fn nested<T>(compare: impl FnOnce() -> Result<T, Raised>) -> Result<T, Raised> {
    let depth = COMPARE_DEPTH.with(Cell::get);
    if depth >= MAX_COMPARE_DEPTH {
        return Err(Raised::new(
            "RecursionError",
            "maximum recursion depth exceeded in comparison",
        ));
    }
    COMPARE_DEPTH.with(|d| d.set(depth + 1));
    let result = compare();
    COMPARE_DEPTH.with(|d| d.set(depth));
    result
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("nan")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "inf" } else { "-inf" })
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        write!(f, "{v:.1}")
    } else {
        write!(f, "{v}")
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    write!(f, "{quote}")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c == quote => write!(f, "\\{c}")?,
            c if c.is_control() => write!(f, "\\x{:02x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "{quote}")
}

fn write_list(f: &mut fmt::Formatter<'_>, list: &List) -> fmt::Result {
    let ptr = Rc::as_ptr(list);
    let cyclic = FORMATTING.with(|active| active.borrow().contains(&ptr));
    if cyclic {
        return f.write_str("[...]");
    }
    // A list mutably borrowed elsewhere cannot be shown.
    let items = list.try_borrow().map_err(|_| fmt::Error)?;

    FORMATTING.with(|active| active.borrow_mut().push(ptr));
    let result = (|| {
        f.write_str("[")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("]")
    })();
    FORMATTING.with(|active| active.borrow_mut().pop());
    result
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write_float(f, *v),
            Value::Str(s) => write_quoted(f, s),
            Value::List(list) => write_list(f, list),
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::Builtin(b) => write!(f, "<built-in function {}>", b.name()),
            Value::ExceptionType(name) => write!(f, "<class '{name}'>"),
            Value::Exception(info) => {
                write!(f, "{}(", info.type_name)?;
                if !info.message.is_empty() {
                    write_quoted(f, &info.message)?;
                }
                f.write_str(")")
            }
        }
    }
}
