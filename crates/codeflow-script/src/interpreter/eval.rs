//! Expression evaluation and operator semantics.
//!
//! Arithmetic follows Python: integer operations are checked (overflow is an
//! `OverflowError` rather than a wrap), `/` always produces a float, and `//`
//! and `%` round toward negative infinity.

use std::cmp::Ordering;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::ast::{BinOp, CmpOp, Expr, Target, UnaryOp};
use crate::error::Raised;
use crate::value::{Scope, Value};

use super::builtins::{self, Args};
use super::Machine;

/// Largest string or list a repetition may produce.
const MAX_REPEAT_LEN: usize = 10_000_000;

impl Machine<'_, '_> {
    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, Raised> {
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Str(s) => Ok(Value::Str(Rc::clone(s))),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::list(values))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, &value)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                self.eval(right)
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                self.eval(right)
            }
            Expr::Call { func, args } => {
                let callee = self.eval(func)?;
                let mut values: Args = SmallVec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call_value(&callee, values)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                get_item(&object, &index)
            }
        }
    }

    fn call_value(&mut self, callee: &Value, args: Args) -> Result<Value, Raised> {
        match callee {
            Value::Function(function) => self.call_function(function, args),
            Value::Builtin(builtin) => builtins::call(*builtin, args, self.output),
            Value::ExceptionType(name) => Ok(builtins::instantiate(name, &args)),
            other => Err(Raised::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Resolves `name` from the current frame outward: locals, the unit's
    /// globals (for unit code only), the prelude, then builtins.
    fn lookup(&self, name: &str) -> Result<Value, Raised> {
        let frame = self.frame()?;
        let found = match &frame.locals {
            Some(locals) => locals.get(name).cloned().or_else(|| match frame.scope {
                Scope::Unit => self.globals.get(name).cloned(),
                Scope::Prelude => None,
            }),
            None => self.globals.get(name).cloned(),
        };
        found
            .or_else(|| self.prelude.get(name).cloned())
            .or_else(|| builtins::lookup(name))
            .ok_or_else(|| Raised::new("NameError", format!("name '{name}' is not defined")))
    }

    pub(crate) fn assign(&mut self, target: &Target, value: Value) -> Result<(), Raised> {
        match target {
            Target::Name(name) => {
                self.store(name, value);
                Ok(())
            }
            Target::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                set_item(&object, &index, value)
            }
        }
    }

    pub(crate) fn aug_assign(&mut self, target: &Target, op: BinOp, value: &Expr) -> Result<(), Raised> {
        match target {
            Target::Name(name) => {
                let current = self.lookup(name)?;
                let value = self.eval(value)?;
                let updated = binary(op, &current, &value)?;
                self.store(name, updated);
                Ok(())
            }
            Target::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let current = get_item(&object, &index)?;
                let value = self.eval(value)?;
                let updated = binary(op, &current, &value)?;
                set_item(&object, &index, updated)
            }
        }
    }

    /// The `n`th item of a `for` loop's iterable, read live so that changes
    /// to a list during iteration are seen.
    pub(crate) fn nth_item(&self, iterable: &Value, n: usize) -> Result<Option<Value>, Raised> {
        match iterable {
            Value::List(items) => Ok(items.borrow().get(n).cloned()),
            Value::Str(s) => Ok(s.chars().nth(n).map(|c| Value::str(c.encode_utf8(&mut [0; 4])))),
            other => Err(builtins::not_iterable(other)),
        }
    }
}

pub(crate) fn unary(op: UnaryOp, value: &Value) -> Result<Value, Raised> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Float(f) => Ok(Value::Float(-f)),
            other => match other.as_int() {
                Some(i) => i.checked_neg().map(Value::Int).ok_or_else(Raised::overflow),
                None => Err(Raised::type_error(format!(
                    "bad operand type for unary -: '{}'",
                    other.type_name()
                ))),
            },
        },
    }
}

pub(crate) fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, Raised> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_binary(op, a, b);
    }
    if let (Some(a), Some(b)) = (left.as_float(), right.as_float()) {
        return float_binary(op, a, b);
    }

    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::Str(Rc::from(joined)))
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut joined = a.borrow().clone();
            joined.extend(b.borrow().iter().cloned());
            Ok(Value::list(joined))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
            let times = repeat_count(n, s.chars().count())?;
            Ok(Value::str(&s.repeat(times)))
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items))
            if n.as_int().is_some() =>
        {
            let items = items.borrow();
            let times = repeat_count(n, items.len())?;
            let mut repeated = Vec::with_capacity(items.len() * times);
            for _ in 0..times {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::list(repeated))
        }
        _ => Err(Raised::type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn repeat_count(n: &Value, unit_len: usize) -> Result<usize, Raised> {
    let times = usize::try_from(n.as_int().unwrap_or(0).max(0)).map_err(|_| Raised::overflow())?;
    match times.checked_mul(unit_len) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(times),
        _ => Err(Raised::new("MemoryError", "repetition result is too large")),
    }
}

fn int_binary(op: BinOp, a: i64, b: i64) -> Result<Value, Raised> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(Raised::zero_division("division by zero"));
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(Raised::zero_division("integer division or modulo by zero"));
            }
            a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(Raised::zero_division("integer division or modulo by zero"));
            }
            a.checked_rem(b).map(|r| if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
        }
    };
    result.map(Value::Int).ok_or_else(Raised::overflow)
}

fn float_binary(op: BinOp, a: f64, b: f64) -> Result<Value, Raised> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(Raised::zero_division("float division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(Raised::zero_division("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(Raised::zero_division("float modulo"));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
    };
    Ok(Value::Float(value))
}

pub(crate) fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, Raised> {
    let ordered = |wanted: fn(Ordering) -> bool| -> Result<bool, Raised> {
        Ok(left.compare(right, op.symbol())?.is_some_and(wanted))
    };
    match op {
        CmpOp::Eq => left.equals(right),
        CmpOp::NotEq => left.equals(right).map(|equal| !equal),
        CmpOp::Lt => ordered(Ordering::is_lt),
        CmpOp::Le => ordered(Ordering::is_le),
        CmpOp::Gt => ordered(Ordering::is_gt),
        CmpOp::Ge => ordered(Ordering::is_ge),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => contains(right, left).map(|found| !found),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, Raised> {
    match container {
        Value::List(items) => {
            for x in items.borrow().iter() {
                if x.equals(item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(&**needle)),
            other => Err(Raised::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        other => Err(Raised::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Maps a possibly negative Python index onto `0..len`.
fn resolve_index(index: &Value, len: usize, container: &str) -> Result<Option<usize>, Raised> {
    let Some(i) = index.as_int() else {
        return Err(Raised::type_error(format!(
            "{container} indices must be integers or slices, not {}",
            index.type_name()
        )));
    };
    let len = i64::try_from(len).map_err(|_| Raised::overflow())?;
    let i = if i < 0 { i + len } else { i };
    Ok((0..len).contains(&i).then_some(i as usize))
}

pub(crate) fn get_item(object: &Value, index: &Value) -> Result<Value, Raised> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            resolve_index(index, items.len(), "list")?
                .map(|i| items[i].clone())
                .ok_or_else(|| Raised::new("IndexError", "list index out of range"))
        }
        Value::Str(s) => {
            let len = s.chars().count();
            resolve_index(index, len, "string")?
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::str(c.encode_utf8(&mut [0; 4])))
                .ok_or_else(|| Raised::new("IndexError", "string index out of range"))
        }
        other => Err(Raised::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

pub(crate) fn set_item(object: &Value, index: &Value, value: Value) -> Result<(), Raised> {
    match object {
        Value::List(items) => {
            let len = items.borrow().len();
            let slot = resolve_index(index, len, "list")?
                .ok_or_else(|| Raised::new("IndexError", "list assignment index out of range"))?;
            items.borrow_mut()[slot] = value;
            Ok(())
        }
        other => Err(Raised::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}
