use std::{iter::Peekable, str::Chars};

use crate::{
    adapters::{parameter_type, wrong_arity, Adapter},
    diagnostics::Error,
    modules::Module,
    value::Value,
};

pub fn module() -> Module {
    let string_arg = || vec![Adapter::Arity(1)];
    let float_arg = || vec![Adapter::Arity(1), Adapter::FloatAt(0)];
    Module::new("prelude")
        .native("str.upper", Value::native_with(string_arg(), upper))
        .native("str.lower", Value::native_with(string_arg(), lower))
        .native("str.title", Value::native_with(string_arg(), title))
        .native("str.trim", Value::native_with(string_arg(), trim))
        .native("sprintf", Value::native_with(vec![Adapter::AtLeast(1)], sprintf))
        .native(
            "math.pow",
            Value::native_with(
                vec![Adapter::Arity(2), Adapter::FloatAt(0), Adapter::FloatAt(1)],
                pow,
            ),
        )
        .native("math.sqrt", Value::native_with(float_arg(), sqrt))
        .native("math.ceil", Value::native_with(float_arg(), ceil))
        .native("math.log", Value::native_with(float_arg(), log))
        .native("nan?", Value::native_with(float_arg(), is_nan))
        .native("pos-inf?", Value::native_with(float_arg(), is_inf))
        .native(
            "in-range?",
            Value::native_with(
                vec![Adapter::Arity(2), Adapter::FloatAt(0), Adapter::FloatAt(1)],
                in_range,
            ),
        )
        .native(
            "combinations",
            Value::native_with(vec![Adapter::AtLeast(1)], combinations),
        )
        .native("transpose", Value::native_with(vec![Adapter::Arity(1)], transpose))
        .lisp_func("pow", "(func [n] (func [x] (math.pow x n)))")
        .lisp_func(
            "with-default",
            "(func [d] (func [x] (if (or (nan? x) (pos-inf? x)) d x)))",
        )
        .lisp_func(
            "positive",
            "(func [d] (func [x] (if (or (nan? x) (pos-inf? x) (< x 0)) d x)))",
        )
        .lisp_func("str", "(func [n] (sprintf \"%v\" n))")
        .script("(var cap (# (func [x] (max %1 (min %2 x)))))")
}

fn upper(args: &[Value]) -> Result<Value, Error> {
    let Value::Str(s) = &args[0] else {
        return Err(parameter_type());
    };
    Ok(Value::Str(s.to_uppercase()))
}

fn lower(args: &[Value]) -> Result<Value, Error> {
    let Value::Str(s) = &args[0] else {
        return Err(parameter_type());
    };
    Ok(Value::Str(s.to_lowercase()))
}

fn title(args: &[Value]) -> Result<Value, Error> {
    let Value::Str(s) = &args[0] else {
        return Err(parameter_type());
    };
    let mut out = String::with_capacity(s.len());
    let mut boundary = true;
    for c in s.chars() {
        if boundary && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        boundary = !c.is_alphabetic();
    }
    Ok(Value::Str(out))
}

fn trim(args: &[Value]) -> Result<Value, Error> {
    let Value::Str(s) = &args[0] else {
        return Err(parameter_type());
    };
    Ok(Value::Str(s.trim().to_string()))
}

fn sprintf(args: &[Value]) -> Result<Value, Error> {
    let Value::Str(format) = &args[0] else {
        return Err(parameter_type());
    };
    Ok(Value::Str(format_values(format, &args[1..])?))
}

fn pow(args: &[Value]) -> Result<Value, Error> {
    let x = args[0].as_float().ok_or_else(parameter_type)?;
    let p = args[1].as_float().ok_or_else(parameter_type)?;
    Ok(Value::Float(x.powf(p)))
}

fn sqrt(args: &[Value]) -> Result<Value, Error> {
    let v = args[0].as_float().ok_or_else(parameter_type)?;
    Ok(Value::Float(v.sqrt()))
}

fn ceil(args: &[Value]) -> Result<Value, Error> {
    let v = args[0].as_float().ok_or_else(parameter_type)?;
    Ok(Value::Float(v.ceil()))
}

fn log(args: &[Value]) -> Result<Value, Error> {
    let v = args[0].as_float().ok_or_else(parameter_type)?;
    Ok(Value::Float(v.ln()))
}

fn is_nan(args: &[Value]) -> Result<Value, Error> {
    let v = args[0].as_float().ok_or_else(parameter_type)?;
    Ok(Value::Bool(v.is_nan()))
}

// Infinity of either sign.
fn is_inf(args: &[Value]) -> Result<Value, Error> {
    let v = args[0].as_float().ok_or_else(parameter_type)?;
    Ok(Value::Bool(v.is_infinite()))
}

fn in_range(args: &[Value]) -> Result<Value, Error> {
    let min = args[0].as_float().ok_or_else(parameter_type)?;
    let max = args[1].as_float().ok_or_else(parameter_type)?;
    Ok(Value::native_with(
        vec![Adapter::Arity(1), Adapter::FloatAt(0)],
        move |args: &[Value]| {
            let v = args[0].as_float().ok_or_else(parameter_type)?;
            Ok(Value::Bool(v >= min && v <= max))
        },
    ))
}

fn combinations(args: &[Value]) -> Result<Value, Error> {
    let mut lists = Vec::with_capacity(args.len());
    for arg in args {
        lists.push(elements(arg)?);
    }
    let mut res = Vec::new();
    let mut base = Vec::new();
    combine(&lists, &mut base, &mut res);
    Ok(Value::list(res))
}

// Depth-first, so the first list varies slowest.
fn combine(lists: &[Vec<Value>], base: &mut Vec<Value>, out: &mut Vec<Value>) {
    let Some((first, rest)) = lists.split_first() else {
        out.push(Value::list(base.clone()));
        return;
    };
    for value in first {
        base.push(value.clone());
        combine(rest, base, out);
        base.pop();
    }
}

fn transpose(args: &[Value]) -> Result<Value, Error> {
    let Value::List(rows) = &args[0] else {
        return Err(parameter_type());
    };
    let rows = rows.borrow().clone();
    if rows.is_empty() {
        return Ok(args[0].clone());
    }
    let mut columns: Vec<Vec<Value>> = Vec::new();
    let mut width = None;
    for row in &rows {
        let Value::List(row) = row else {
            return Err(Error::new("expected list of lists"));
        };
        let row = row.borrow();
        match width {
            None => {
                width = Some(row.len());
                columns = vec![Vec::with_capacity(rows.len()); row.len()];
            }
            Some(width) if width != row.len() => {
                return Err(Error::new("all lists must be the same length"));
            }
            Some(_) => {}
        }
        for (column, value) in columns.iter_mut().zip(row.iter()) {
            column.push(value.clone());
        }
    }
    Ok(Value::list(columns.into_iter().map(Value::list).collect()))
}

fn elements(value: &Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::List(values) => Ok(values.borrow().clone()),
        Value::Vector(values) => {
            Ok(values.borrow().iter().map(|n| Value::Float(*n)).collect())
        }
        _ => Err(parameter_type()),
    }
}

/// Renders `format` with printf-style verbs: `%v` and `%s` display any
/// value, `%d` and `%x` take an int, `%f`, `%e` and `%g` take a float,
/// `%%` is a literal percent. Width, precision and the `-`/`0` flags
/// work as in `%6d`, `%.2f`, `%08.3f`. Verb and argument counts must
/// match exactly.
pub(crate) fn format_values(format: &str, args: &[Value]) -> Result<String, Error> {
    let mut out = String::new();
    let mut chars = format.chars().peekable();
    let mut args = args.iter();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let spec = parse_spec(&mut chars)?;
        let arg = args.next().ok_or_else(wrong_arity)?;
        out.push_str(&render(&spec, arg)?);
    }
    if args.next().is_some() {
        return Err(wrong_arity());
    }
    Ok(out)
}

struct Spec {
    minus: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
    verb: Verb,
}

enum Verb {
    Display,
    Int,
    Hex,
    Fixed,
    Exponent,
    Compact,
}

fn parse_spec(chars: &mut Peekable<Chars>) -> Result<Spec, Error> {
    let mut minus = false;
    let mut zero = false;
    loop {
        match chars.peek() {
            Some('-') => minus = true,
            Some('0') => zero = true,
            _ => break,
        }
        chars.next();
    }
    let width = parse_digits(chars);
    let precision = if chars.peek() == Some(&'.') {
        chars.next();
        Some(parse_digits(chars).unwrap_or(0))
    } else {
        None
    };
    let verb = match chars.next() {
        Some('v') | Some('s') => Verb::Display,
        Some('d') => Verb::Int,
        Some('x') => Verb::Hex,
        Some('f') => Verb::Fixed,
        Some('e') => Verb::Exponent,
        Some('g') => Verb::Compact,
        Some(c) => return Err(Error::new(format!("unsupported format verb %{c}"))),
        None => return Err(Error::new("missing format verb")),
    };
    Ok(Spec {
        minus,
        zero,
        width,
        precision,
        verb,
    })
}

fn parse_digits(chars: &mut Peekable<Chars>) -> Option<usize> {
    let mut n = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = Some(n.unwrap_or(0) * 10 + d as usize);
        chars.next();
    }
    n
}

fn render(spec: &Spec, arg: &Value) -> Result<String, Error> {
    let (text, numeric) = match spec.verb {
        Verb::Display => (format!("{arg}"), false),
        Verb::Int => match arg {
            Value::Int(n) => (n.to_string(), true),
            _ => return Err(parameter_type()),
        },
        Verb::Hex => match arg {
            Value::Int(n) if *n < 0 => (format!("-{:x}", n.unsigned_abs()), true),
            Value::Int(n) => (format!("{n:x}"), true),
            _ => return Err(parameter_type()),
        },
        Verb::Fixed => match arg {
            Value::Float(n) => {
                (format!("{:.*}", spec.precision.unwrap_or(6), n), true)
            }
            _ => return Err(parameter_type()),
        },
        Verb::Exponent => match arg {
            Value::Float(n) => {
                (format!("{:.*e}", spec.precision.unwrap_or(6), n), true)
            }
            _ => return Err(parameter_type()),
        },
        Verb::Compact => match arg {
            Value::Float(n) => (n.to_string(), true),
            _ => return Err(parameter_type()),
        },
    };
    Ok(pad(text, spec, numeric))
}

fn pad(text: String, spec: &Spec, numeric: bool) -> String {
    let Some(width) = spec.width else {
        return text;
    };
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let fill = width - len;
    if spec.minus {
        return format!("{}{}", text, " ".repeat(fill));
    }
    if spec.zero && numeric {
        return match text.strip_prefix('-') {
            Some(rest) => format!("-{}{}", "0".repeat(fill), rest),
            None => format!("{}{}", "0".repeat(fill), text),
        };
    }
    format!("{}{}", " ".repeat(fill), text)
}
