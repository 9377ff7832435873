//! Native functions and exception classes.

use std::cmp::Ordering;
use std::rc::Rc;

use codeflow_core::ExceptionInfo;
use smallvec::SmallVec;

use crate::error::Raised;
use crate::value::Value;

/// Evaluated call arguments; most calls take a handful.
pub type Args = SmallVec<[Value; 4]>;

/// Upper bound on the length of a list built by `range`.
pub const MAX_RANGE_LEN: usize = 10_000_000;

/// Exception classes available by name.
pub const EXCEPTION_TYPES: &[&str] = &[
    "Exception",
    "ValueError",
    "TypeError",
    "ZeroDivisionError",
    "IndexError",
    "KeyError",
    "NameError",
    "RuntimeError",
    "RecursionError",
    "AssertionError",
    "OverflowError",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Max,
    Min,
    Abs,
    Range,
    Str,
    Int,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::Abs => "abs",
            Builtin::Range => "range",
            Builtin::Str => "str",
            Builtin::Int => "int",
        }
    }

    fn from_name(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "print" => Builtin::Print,
            "len" => Builtin::Len,
            "max" => Builtin::Max,
            "min" => Builtin::Min,
            "abs" => Builtin::Abs,
            "range" => Builtin::Range,
            "str" => Builtin::Str,
            "int" => Builtin::Int,
            _ => return None,
        };
        Some(builtin)
    }
}

/// Resolves a name in the builtin namespace.
pub fn lookup(name: &str) -> Option<Value> {
    if let Some(builtin) = Builtin::from_name(name) {
        return Some(Value::Builtin(builtin));
    }
    EXCEPTION_TYPES
        .iter()
        .find(|&&t| t == name)
        .map(|&t| Value::ExceptionType(t))
}

/// Invokes `builtin`. Lines written by `print` are appended to `output`.
pub fn call(builtin: Builtin, args: Args, output: &mut Vec<String>) -> Result<Value, Raised> {
    match builtin {
        Builtin::Print => {
            let line: Vec<String> = args.iter().map(Value::str_form).collect();
            output.push(line.join(" "));
            Ok(Value::None)
        }
        Builtin::Len => {
            let [value] = exact::<1>("len", args)?;
            len(&value).map(Value::Int)
        }
        Builtin::Max => extreme("max", args, Ordering::Greater),
        Builtin::Min => extreme("min", args, Ordering::Less),
        Builtin::Abs => {
            let [value] = exact::<1>("abs", args)?;
            match value {
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => match other.as_int() {
                    Some(i) => i.checked_abs().map(Value::Int).ok_or_else(Raised::overflow),
                    None => Err(Raised::type_error(format!(
                        "bad operand type for abs(): '{}'",
                        other.type_name()
                    ))),
                },
            }
        }
        Builtin::Range => range(args),
        Builtin::Str => match args.len() {
            0 => Ok(Value::str("")),
            1 => Ok(Value::str(&args[0].str_form())),
            n => Err(arity("str", "at most 1 argument", n)),
        },
        Builtin::Int => match args.len() {
            0 => Ok(Value::Int(0)),
            1 => to_int(&args[0]),
            n => Err(arity("int", "at most 1 argument", n)),
        },
    }
}

/// Builds an exception instance from a class and constructor arguments.
pub fn instantiate(type_name: &str, args: &Args) -> Value {
    let message = match args.len() {
        0 => String::new(),
        1 => args[0].str_form(),
        _ => {
            let parts: Vec<String> = args.iter().map(Value::to_string).collect();
            format!("({})", parts.join(", "))
        }
    };
    Value::Exception(Rc::new(ExceptionInfo::new(type_name, message)))
}

/// Materializes an iterable into its items.
pub fn iterate(value: &Value) -> Result<Vec<Value>, Raised> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.encode_utf8(&mut [0; 4]))).collect()),
        other => Err(not_iterable(other)),
    }
}

pub fn not_iterable(value: &Value) -> Raised {
    Raised::type_error(format!("'{}' object is not iterable", value.type_name()))
}

fn len(value: &Value) -> Result<i64, Raised> {
    let n = match value {
        Value::List(items) => items.borrow().len(),
        Value::Str(s) => s.chars().count(),
        other => {
            return Err(Raised::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    i64::try_from(n).map_err(|_| Raised::overflow())
}

fn extreme(name: &str, args: Args, keep: Ordering) -> Result<Value, Raised> {
    let items = match args.len() {
        0 => return Err(arity(name, "at least 1 argument", 0)),
        1 => iterate(&args[0])?,
        _ => args.into_vec(),
    };

    let mut best: Option<Value> = None;
    for item in items {
        best = Some(match best {
            None => item,
            Some(current) => {
                let op = if keep == Ordering::Greater { ">" } else { "<" };
                if item.compare(&current, op)? == Some(keep) {
                    item
                } else {
                    current
                }
            }
        });
    }
    best.ok_or_else(|| Raised::value_error(format!("{name}() arg is an empty sequence")))
}

fn range(args: Args) -> Result<Value, Raised> {
    let mut ints = Vec::with_capacity(args.len());
    for arg in &args {
        match arg.as_int() {
            Some(i) => ints.push(i),
            None => {
                return Err(Raised::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    arg.type_name()
                )))
            }
        }
    }

    let (start, stop, step) = match *ints.as_slice() {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => return Err(arity("range", "1 to 3 arguments", args.len())),
    };
    if step == 0 {
        return Err(Raised::value_error("range() arg 3 must not be zero"));
    }

    let span = if step > 0 {
        i128::from(stop) - i128::from(start)
    } else {
        i128::from(start) - i128::from(stop)
    };
    let step_abs = i128::from(step).abs();
    let count = if span <= 0 { 0 } else { (span + step_abs - 1) / step_abs };
    if count > MAX_RANGE_LEN as i128 {
        return Err(Raised::new("OverflowError", "range() result is too large"));
    }

    let items = (0..count)
        .map(|k| Value::Int((i128::from(start) + k * i128::from(step)) as i64))
        .collect();
    Ok(Value::list(items))
}

fn to_int(value: &Value) -> Result<Value, Raised> {
    match value {
        Value::Float(f) if f.is_nan() => Err(Raised::value_error("cannot convert float NaN to integer")),
        Value::Float(f) if f.is_infinite() => Err(Raised::new(
            "OverflowError",
            "cannot convert float infinity to integer",
        )),
        Value::Float(f) => {
            let truncated = f.trunc();
            if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(Raised::overflow());
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Str(s) => {
            let text = s.trim();
            text.replace('_', "")
                .parse::<i64>()
                .ok()
                .filter(|_| !text.starts_with('_') && !text.ends_with('_'))
                .map(Value::Int)
                .ok_or_else(|| {
                    Raised::value_error(format!("invalid literal for int() with base 10: {value}"))
                })
        }
        other => other.as_int().map(Value::Int).ok_or_else(|| {
            Raised::type_error(format!(
                "int() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn exact<const N: usize>(name: &str, args: Args) -> Result<[Value; N], Raised> {
    let given = args.len();
    let expected = if N == 1 {
        "exactly one argument".to_string()
    } else {
        format!("exactly {N} arguments")
    };
    args.into_vec()
        .try_into()
        .map_err(|_| arity(name, &expected, given))
}

fn arity(name: &str, expected: &str, given: usize) -> Raised {
    Raised::type_error(format!("{name}() takes {expected} ({given} given)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn run(builtin: Builtin, args: Args) -> Result<Value, Raised> {
        call(builtin, args, &mut Vec::new())
    }

    #[test]
    fn print_joins_str_forms() {
        let mut output = Vec::new();
        call(
            Builtin::Print,
            smallvec![Value::str("total"), Value::Int(7), Value::list(vec![Value::str("a")])],
            &mut output,
        )
        .unwrap();
        assert_eq!(output, vec!["total 7 ['a']"]);
    }

    #[test]
    fn len_of_list_and_str() {
        assert!(run(Builtin::Len, smallvec![Value::str("héllo")]).unwrap().equals(&Value::Int(5)).unwrap());
        let err = run(Builtin::Len, smallvec![Value::Int(3)]).unwrap_err();
        assert_eq!(err.message(), "object of type 'int' has no len()");
        let err = run(Builtin::Len, smallvec![]).unwrap_err();
        assert_eq!(err.message(), "len() takes exactly one argument (0 given)");
    }

    #[test]
    fn max_and_min() {
        let max = run(Builtin::Max, smallvec![Value::Int(3), Value::Float(4.5), Value::Int(1)]);
        assert!(max.unwrap().equals(&Value::Float(4.5)).unwrap());
        let list = Value::list(vec![Value::Int(3), Value::Int(-2)]);
        assert!(run(Builtin::Min, smallvec![list]).unwrap().equals(&Value::Int(-2)).unwrap());
        let err = run(Builtin::Max, smallvec![Value::list(vec![])]).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: max() arg is an empty sequence");
    }

    #[test]
    fn range_variants() {
        let show = |args: Args| run(Builtin::Range, args).unwrap().to_string();
        assert_eq!(show(smallvec![Value::Int(4)]), "[0, 1, 2, 3]");
        assert_eq!(show(smallvec![Value::Int(2), Value::Int(5)]), "[2, 3, 4]");
        assert_eq!(show(smallvec![Value::Int(5), Value::Int(0), Value::Int(-2)]), "[5, 3, 1]");
        assert_eq!(show(smallvec![Value::Int(3), Value::Int(1)]), "[]");

        let err = run(Builtin::Range, smallvec![Value::Int(0), Value::Int(1), Value::Int(0)]);
        assert_eq!(err.unwrap_err().message(), "range() arg 3 must not be zero");
        let err = run(Builtin::Range, smallvec![Value::Int(i64::MAX)]).unwrap_err();
        assert_eq!(err.type_name(), "OverflowError");
    }

    #[test]
    fn int_conversions() {
        assert!(run(Builtin::Int, smallvec![Value::Float(-2.7)]).unwrap().equals(&Value::Int(-2)).unwrap());
        assert!(run(Builtin::Int, smallvec![Value::str(" 42 ")]).unwrap().equals(&Value::Int(42)).unwrap());
        let err = run(Builtin::Int, smallvec![Value::str("4x")]).unwrap_err();
        assert_eq!(err.message(), "invalid literal for int() with base 10: '4x'");
    }

    #[test]
    fn abs_overflow_is_reported() {
        let err = run(Builtin::Abs, smallvec![Value::Int(i64::MIN)]).unwrap_err();
        assert_eq!(err.to_string(), "OverflowError: integer overflow");
    }

    #[test]
    fn names_resolve() {
        assert!(matches!(lookup("len"), Some(Value::Builtin(Builtin::Len))));
        assert!(matches!(lookup("KeyError"), Some(Value::ExceptionType("KeyError"))));
        assert!(lookup("sum").is_none());
    }

    #[test]
    fn exception_instances() {
        let exc = instantiate("ValueError", &smallvec![Value::str("bad")]);
        assert_eq!(exc.to_string(), "ValueError('bad')");
        let exc = instantiate("KeyError", &smallvec![]);
        assert_eq!(exc.to_string(), "KeyError()");
    }
}
