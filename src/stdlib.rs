use std::time::Instant;

use indexmap::IndexMap;

use crate::{
    adapters::{parameter_type, wrong_arity, Adapter},
    ast::{Node, NodeKind},
    diagnostics::Error,
    environment::{Scope, ScopeRef},
    modules::Module,
    parser, prelude,
    runtime::{self, apply, container_get, dict_from_pairs, resolve_index, Env, Program},
    value::{DictKey, Value},
};

pub fn core_module() -> Module {
    let m = Module::new("core");
    let m = constants(m);
    let m = forms(m);
    let m = numerics(m);
    let m = containers(m);
    let m = higher_order(m);
    lisp_entries(m)
}

fn constants(m: Module) -> Module {
    m.native("true", Value::Bool(true))
        .native("false", Value::Bool(false))
        .native("nil", Value::Nil)
        .native("nan", Value::Float(f64::NAN))
}

fn forms(m: Module) -> Module {
    m.native("if", Value::special(if_form))
        .native("cond", Value::special(cond_form))
        .native("and", Value::special(and_form))
        .native("or", Value::special(or_form))
        .native("var", Value::special(var_form))
        .native("set", Value::special(set_form))
        .native("do", Value::special(do_form))
        .native("func", Value::special(func_form))
        .native("fn", Value::special(func_form))
        .native("#", Value::special(macro_form))
        .native("for", Value::special(for_form))
        .native("while", Value::special(while_form))
        .native("reduce", Value::special(reduce_form))
        .native("printf", Value::special(printf_form))
        .native("time", Value::special(time_form))
        .native("code", Value::special(code_form))
        .native("load", Value::special(load_form))
        .native("eval", Value::native_with(vec![Adapter::Arity(1)], eval_source))
        .native("error", Value::native(raise))
}

fn numerics(m: Module) -> Module {
    let unified = || vec![Adapter::SameBaseType, Adapter::Slicify];
    let relational = || vec![Adapter::Arity(2), Adapter::SameBaseType];
    m.native("+", Value::native_with(unified(), add))
        .native("-", Value::native_with(unified(), subtract))
        .native("*", Value::native_with(unified(), multiply))
        .native("/", Value::native_with(unified(), divide))
        .native(
            "%",
            Value::native_with(vec![Adapter::AtLeast(2), Adapter::SameBaseType], modulo),
        )
        .native("==", Value::native(equal))
        .native("!=", Value::native(not_equal))
        .native("<", Value::native_with(relational(), less_than))
        .native("<=", Value::native_with(relational(), less_or_equal))
        .native(">", Value::native_with(relational(), greater_than))
        .native(">=", Value::native_with(relational(), greater_or_equal))
        .native("!", Value::native_with(vec![Adapter::Arity(1)], not))
        .native("not", Value::native_with(vec![Adapter::Arity(1)], not))
        .native(
            "int",
            Value::native_with(vec![Adapter::Arity(1), Adapter::IntAt(0)], first_arg),
        )
        .native(
            "float",
            Value::native_with(vec![Adapter::Arity(1), Adapter::FloatAt(0)], first_arg),
        )
        .native("min", Value::native_with(vec![Adapter::AtLeast(1)], min_value))
        .native("max", Value::native_with(vec![Adapter::AtLeast(1)], max_value))
}

fn containers(m: Module) -> Module {
    m.native("list", Value::native(new_list))
        .native("vec", Value::native(new_vector))
        .native("dict", Value::native(new_dict))
        .native("vec?", Value::native_with(vec![Adapter::Arity(1)], is_vector))
        .native("list?", Value::native_with(vec![Adapter::Arity(1)], is_list))
        .native("dict?", Value::native_with(vec![Adapter::Arity(1)], is_dict))
        .native("dict-keys", Value::native_with(vec![Adapter::Arity(1)], dict_keys))
        .native("vec2list", Value::native(vector_to_list))
        .native("get", Value::native_with(vec![Adapter::Arity(2)], get))
        .native("len", Value::native_with(vec![Adapter::Arity(1)], length))
        .native("sub", Value::native_with(vec![Adapter::Arity(3)], sub))
        .native("contains?", Value::native_with(vec![Adapter::Arity(2)], contains))
        .native("update!", Value::native_with(vec![Adapter::Arity(3)], update))
        .native("append", Value::native_with(vec![Adapter::AtLeast(2)], append))
        .native("concat", Value::native_with(vec![Adapter::AtLeast(1)], concat))
        .native("merge", Value::native_with(vec![Adapter::AtLeast(2)], merge))
        .native(
            "range",
            Value::native_with(vec![Adapter::Arity(3), Adapter::SameBaseType], range),
        )
        .native(
            "vec-range",
            Value::native_with(vec![Adapter::Arity(3), Adapter::SameBaseType], vec_range),
        )
        .native("repeat", Value::native_with(vec![Adapter::Arity(2)], repeat))
        .native("vec-repeat", Value::native_with(vec![Adapter::Arity(2)], vec_repeat))
        .native("reverse", Value::native_with(vec![Adapter::Arity(1)], reverse))
        .native(
            "skip",
            Value::native_with(vec![Adapter::Arity(2), Adapter::IntAt(0)], skip),
        )
        .native(
            "take",
            Value::native_with(vec![Adapter::Arity(2), Adapter::IntAt(0)], take),
        )
        .native("flatten", Value::native_with(vec![Adapter::AtLeast(1)], flatten))
}

fn higher_order(m: Module) -> Module {
    m.native("map", Value::native_with(vec![Adapter::AtLeast(2)], map))
        .native("map-indexed", Value::native_with(vec![Adapter::AtLeast(2)], map_indexed))
        .native("vec-map", Value::native_with(vec![Adapter::AtLeast(2)], vec_map))
        .native(
            "vec-map-indexed",
            Value::native_with(vec![Adapter::AtLeast(2)], vec_map_indexed),
        )
        .native("filter", Value::native(filter))
        .native("count-if", Value::native(count_if))
        .native("apply", Value::native_with(vec![Adapter::Arity(2)], apply_to))
        .native("vec-apply", Value::native_with(vec![Adapter::Arity(2)], vec_apply))
        .native("sort-asc", Value::native_with(vec![Adapter::Arity(2)], sort_asc))
        .native("sort-desc", Value::native_with(vec![Adapter::Arity(2)], sort_desc))
        .native("sortindex", Value::native_with(vec![Adapter::Arity(2)], sort_index))
        .native("bind", Value::native(bind))
        .native("repeatedly", Value::native_with(vec![Adapter::Arity(2)], repeatedly))
        .native("->", Value::native(thread))
}

fn lisp_entries(m: Module) -> Module {
    m.lisp_func("identity", "(func [x] x)")
        .lisp_func("empty?", "(func [x] (if (nil? x) true (== (len x) 0)))")
        .lisp_func("first", "(func [s] (get s 0))")
        .lisp_func("second", "(func [s] (get s 1))")
        .lisp_func("rest", "(func [s] (skip 1 s))")
        .lisp_func("last", "(func [s] (if (empty? s) nil (get s (- (len s) 1))))")
        .lisp_func("inc", "(func [s] (+ s 1))")
        .lisp_func("dec", "(func [s] (- s 1))")
        .lisp_func("def", "var")
        .lisp_func("nil?", "(fn [v] (== v nil))")
}

fn if_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() < 2 || nodes.len() > 3 {
        return Err(Error::new("function \"if\" takes two or three arguments"));
    }
    if runtime::eval(scope, &nodes[0])?.is_truthy() {
        runtime::eval(scope, &nodes[1])
    } else {
        match nodes.get(2) {
            Some(node) => runtime::eval(scope, node),
            None => Ok(Value::Bool(false)),
        }
    }
}

fn cond_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() < 2 {
        return Err(Error::new("function \"cond\" takes two or more arguments"));
    }
    let mut pairs = nodes.chunks_exact(2);
    for pair in &mut pairs {
        if runtime::eval(scope, &pair[0])?.is_truthy() {
            return runtime::eval(scope, &pair[1]);
        }
    }
    match pairs.remainder() {
        [default] => runtime::eval(scope, default),
        _ => Ok(Value::Bool(false)),
    }
}

fn and_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    let mut value = Value::Bool(true);
    for node in nodes {
        value = runtime::eval(scope, node)?;
        if !value.is_truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(value)
}

fn or_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    for node in nodes {
        let value = runtime::eval(scope, node)?;
        if value.is_truthy() {
            return Ok(value);
        }
    }
    Ok(Value::Bool(false))
}

fn var_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.is_empty() || nodes.len() > 2 {
        return Err(Error::new("var takes one or two arguments"));
    }
    let NodeKind::Symbol(name) = &nodes[0].kind else {
        return Err(Error::new("var takes a symbol as first argument"));
    };
    let value = match nodes.get(1) {
        Some(node) => runtime::eval(scope, node)?,
        None => Value::Nil,
    };
    Scope::create(scope, name, value)?;
    Ok(Value::Nil)
}

fn set_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() != 2 {
        return Err(Error::new("function \"set\" takes two arguments"));
    }
    let NodeKind::Symbol(name) = &nodes[0].kind else {
        return Err(Error::new("function \"set\" takes a symbol as first argument"));
    };
    let value = runtime::eval(scope, &nodes[1])?;
    Scope::set(scope, name, value)?;
    Ok(Value::Nil)
}

fn do_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    let scope = Scope::branch(scope);
    let mut value = Value::Nil;
    for node in nodes {
        value = runtime::eval(&scope, node)?;
    }
    Ok(value)
}

fn func_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() < 2 {
        return Err(Error::new("func takes two or more arguments"));
    }
    let (name, rest) = match &nodes[0].kind {
        NodeKind::Symbol(name) => (Some(name.clone()), &nodes[1..]),
        _ => (None, nodes),
    };
    let Some((params_node, body)) = rest.split_first() else {
        return Err(Error::new("func takes a list of parameter symbols"));
    };
    let NodeKind::ListList(param_nodes) = &params_node.kind else {
        return Err(Error::new("func takes a list of parameter symbols"));
    };
    let mut params = Vec::with_capacity(param_nodes.len());
    for node in param_nodes {
        let NodeKind::Symbol(param) = &node.kind else {
            return Err(Error::new("func takes a list of parameter symbols"));
        };
        params.push(param.clone());
    }
    if body.is_empty() {
        return Err(Error::new("func takes a function body"));
    }
    let value = Value::closure(name.clone(), params, body.to_vec(), scope.clone());
    if let Some(name) = name {
        Scope::create(scope, &name, value.clone())?;
    }
    Ok(value)
}

// The produced callable rebinds %1, %2, ... in the scope that was
// captured at definition time, not in a branch of it.
fn macro_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() != 1 {
        return Err(Error::new("# takes one argument"));
    }
    let captured = scope.clone();
    let node = nodes[0].clone();
    Ok(Value::native(move |args: &[Value]| {
        for (i, arg) in args.iter().enumerate() {
            Scope::set_or_create(&captured, &format!("%{}", i + 1), arg.clone());
        }
        runtime::eval(&captured, &node)
    }))
}

fn for_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() < 4 {
        return Err(Error::new("for takes four or more arguments"));
    }
    let scope = Scope::branch(scope);
    runtime::eval(&scope, &nodes[0])?;
    let mut value = Value::Nil;
    loop {
        if !runtime::eval(&scope, &nodes[1])?.is_truthy() {
            return Ok(value);
        }
        for node in &nodes[3..] {
            value = runtime::eval(&scope, node)?;
        }
        runtime::eval(&scope, &nodes[2])?;
    }
}

fn while_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() < 2 {
        return Err(Error::new("while takes 2 or more arguments"));
    }
    let scope = Scope::branch(scope);
    let mut value = Value::Nil;
    loop {
        let more = match runtime::eval(&scope, &nodes[0])? {
            Value::Bool(more) => more,
            test => matches!(apply(&test, &[])?, Value::Bool(true)),
        };
        if !more {
            return Ok(value);
        }
        for node in &nodes[1..] {
            value = runtime::eval(&scope, node)?;
        }
    }
}

// A nil accumulator seeds from the first element only at the start of
// the fold; callbacks are free to return nil mid-way.
fn reduce_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() != 2 && nodes.len() != 3 {
        return Err(Error::new("reduce takes two or three arguments"));
    }
    let callback = runtime::eval(scope, &nodes[0])?;
    let items = sequence_values(&runtime::eval(scope, &nodes[1])?)?;
    let mut acc = match nodes.get(2) {
        Some(node) => runtime::eval(scope, node)?,
        None => Value::Nil,
    };
    for (i, item) in items.into_iter().enumerate() {
        if i == 0 && matches!(acc, Value::Nil) {
            acc = item;
        } else {
            acc = apply(&callback, &[acc, item])?;
        }
    }
    Ok(acc)
}

fn printf_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    let Some((format, rest)) = nodes.split_first() else {
        return Err(Error::new("printf function requires at least a string argument"));
    };
    let format = match runtime::eval(scope, format)? {
        Value::Str(format) => format,
        _ => return Err(Error::new("printf requires a string argument")),
    };
    let mut args = Vec::with_capacity(rest.len());
    for node in rest {
        args.push(runtime::eval(scope, node)?);
    }
    let text = prelude::format_values(&format, &args)?;
    Scope::print(scope, &text)?;
    Ok(Value::Nil)
}

fn time_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() != 1 {
        return Err(Error::new("time takes 1 argument"));
    }
    let started = Instant::now();
    let result = runtime::eval(scope, &nodes[0]);
    let elapsed = started.elapsed().as_secs_f64() * 1000.0;
    Scope::print(scope, &format!("Elapsed {elapsed:.2} milliseconds\n"))?;
    result
}

fn code_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() != 1 {
        return Err(Error::new("code takes one argument"));
    }
    let text = Scope::sources(scope).borrow().code(nodes[0].span);
    Ok(Value::Str(text))
}

fn load_form(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    if nodes.len() != 1 {
        return Err(Error::new("load function takes a single string argument"));
    }
    let source = match runtime::eval(scope, &nodes[0])? {
        Value::Str(source) => source,
        _ => return Err(parameter_type()),
    };
    let sources = Scope::sources(scope);
    let node = parser::parse(&sources, "", &source)?;
    runtime::eval(scope, &node)
}

fn eval_source(args: &[Value]) -> Result<Value, Error> {
    let Value::Str(source) = &args[0] else {
        return Err(parameter_type());
    };
    let program =
        Program::new(source).map_err(|err| Error::new(format!("error in eval: {err}")))?;
    program.eval(&Env::new())
}

fn raise(args: &[Value]) -> Result<Value, Error> {
    if let [Value::Str(message)] = args {
        return Err(Error::new(message.clone()));
    }
    Err(Error::new("error function takes a single string argument"))
}

fn add(args: &[Value]) -> Result<Value, Error> {
    if args.is_empty() {
        return Ok(Value::Int(0));
    }
    match &args[0] {
        Value::Str(_) => {
            let mut text = String::new();
            for arg in args {
                let Value::Str(s) = arg else {
                    return Err(parameter_type());
                };
                text.push_str(s);
            }
            Ok(Value::Str(text))
        }
        Value::Vector(_) => fold_vectors(args, |a, b| a + b),
        _ => fold_scalars(args, |a, b| Ok(a.wrapping_add(b)), |a, b| a + b),
    }
}

fn subtract(args: &[Value]) -> Result<Value, Error> {
    if args.is_empty() {
        return Err(Error::new("function \"-\" takes one or more arguments"));
    }
    if args.len() == 1 {
        return match &args[0] {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Float(n) => Ok(Value::Float(-n)),
            Value::Vector(values) => {
                Ok(Value::vector(values.borrow().iter().map(|n| -n).collect()))
            }
            _ => Err(parameter_type()),
        };
    }
    match &args[0] {
        Value::Vector(_) => fold_vectors(args, |a, b| a - b),
        _ => fold_scalars(args, |a, b| Ok(a.wrapping_sub(b)), |a, b| a - b),
    }
}

fn multiply(args: &[Value]) -> Result<Value, Error> {
    if args.is_empty() {
        return Ok(Value::Int(1));
    }
    match &args[0] {
        Value::Vector(_) => fold_vectors(args, |a, b| a * b),
        _ => fold_scalars(args, |a, b| Ok(a.wrapping_mul(b)), |a, b| a * b),
    }
}

fn divide(args: &[Value]) -> Result<Value, Error> {
    if args.len() < 2 {
        return Err(Error::new("function \"/\" takes two or more arguments"));
    }
    match &args[0] {
        Value::Vector(_) => fold_vectors(args, |a, b| a / b),
        _ => fold_scalars(args, div_int, |a, b| a / b),
    }
}

fn div_int(a: i64, b: i64) -> Result<i64, Error> {
    if b == 0 {
        return Err(Error::new("division by zero"));
    }
    Ok(a.wrapping_div(b))
}

fn modulo(args: &[Value]) -> Result<Value, Error> {
    let Value::Int(first) = &args[0] else {
        return Err(parameter_type());
    };
    let mut acc = *first;
    for arg in &args[1..] {
        let Value::Int(n) = arg else {
            return Err(parameter_type());
        };
        if *n == 0 {
            return Err(Error::new("division by zero"));
        }
        acc = acc.wrapping_rem(*n);
    }
    Ok(Value::Int(acc))
}

fn equal(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(Error::new("== takes two values"));
    }
    Ok(Value::Bool(args[0] == args[1]))
}

fn not_equal(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(Error::new("!= takes two values"));
    }
    Ok(Value::Bool(args[0] != args[1]))
}

fn less_than(args: &[Value]) -> Result<Value, Error> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Bool(a < b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a < b)),
        _ => Err(parameter_type()),
    }
}

fn less_or_equal(args: &[Value]) -> Result<Value, Error> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a <= b)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Bool(a <= b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a <= b)),
        _ => Err(parameter_type()),
    }
}

fn greater_than(args: &[Value]) -> Result<Value, Error> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a > b)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Bool(a > b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a > b)),
        _ => Err(parameter_type()),
    }
}

fn greater_or_equal(args: &[Value]) -> Result<Value, Error> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a >= b)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Bool(a >= b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a >= b)),
        _ => Err(parameter_type()),
    }
}

fn not(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        _ => Err(parameter_type()),
    }
}

fn first_arg(args: &[Value]) -> Result<Value, Error> {
    Ok(args[0].clone())
}

fn min_value(args: &[Value]) -> Result<Value, Error> {
    extremum(args, nan_min)
}

fn max_value(args: &[Value]) -> Result<Value, Error> {
    extremum(args, nan_max)
}

fn extremum(args: &[Value], pick: fn(f64, f64) -> f64) -> Result<Value, Error> {
    let mut acc: Option<f64> = None;
    let mut float = false;
    for arg in args {
        let n = match arg {
            Value::Int(n) => *n as f64,
            Value::Float(n) => {
                float = true;
                *n
            }
            _ => return Err(parameter_type()),
        };
        acc = Some(match acc {
            Some(a) => pick(a, n),
            None => n,
        });
    }
    let acc = acc.ok_or_else(wrong_arity)?;
    if float {
        Ok(Value::Float(acc))
    } else {
        Ok(Value::Int(acc as i64))
    }
}

fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

fn new_list(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::list(args.to_vec()))
}

fn new_vector(args: &[Value]) -> Result<Value, Error> {
    match args.first() {
        None => Ok(Value::vector(Vec::new())),
        Some(Value::Vector(_)) => Ok(args[0].clone()),
        Some(Value::List(values)) => {
            let values = values.borrow();
            let mut res = Vec::with_capacity(values.len());
            for value in values.iter() {
                res.push(value.as_float().ok_or_else(parameter_type)?);
            }
            Ok(Value::vector(res))
        }
        Some(_) => {
            let mut res = Vec::with_capacity(args.len());
            for value in args {
                res.push(value.as_float().ok_or_else(parameter_type)?);
            }
            Ok(Value::vector(res))
        }
    }
}

fn new_dict(args: &[Value]) -> Result<Value, Error> {
    dict_from_pairs(args)
}

fn is_vector(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(args[0], Value::Vector(_))))
}

fn is_list(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(args[0], Value::List(_))))
}

fn is_dict(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(args[0], Value::Dict(_))))
}

fn dict_keys(args: &[Value]) -> Result<Value, Error> {
    let Value::Dict(entries) = &args[0] else {
        return Err(Error::new("dict-keys expects a dictionary"));
    };
    Ok(Value::list(entries.borrow().keys().map(DictKey::to_value).collect()))
}

fn vector_to_list(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(wrong_arity());
    }
    let Value::Vector(values) = &args[0] else {
        return Err(parameter_type());
    };
    Ok(Value::list(values.borrow().iter().map(|n| Value::Float(*n)).collect()))
}

fn get(args: &[Value]) -> Result<Value, Error> {
    container_get(&args[0], &args[1])
}

fn length(args: &[Value]) -> Result<Value, Error> {
    let len = match &args[0] {
        Value::Dict(entries) => entries.borrow().len(),
        Value::List(values) => values.borrow().len(),
        Value::Vector(values) => values.borrow().len(),
        Value::Str(s) => s.chars().count(),
        _ => return Err(parameter_type()),
    };
    Ok(Value::Int(len as i64))
}

fn sub(args: &[Value]) -> Result<Value, Error> {
    let from = args[1].as_int().ok_or_else(parameter_type)?;
    let to = args[2].as_int().ok_or_else(parameter_type)?;
    match &args[0] {
        Value::List(values) => {
            let values = values.borrow();
            let (from, to) = sub_range(from, to, values.len())?;
            Ok(Value::list(values[from..to].to_vec()))
        }
        Value::Vector(values) => {
            let values = values.borrow();
            let (from, to) = sub_range(from, to, values.len())?;
            Ok(Value::vector(values[from..to].to_vec()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (from, to) = sub_range(from, to, chars.len())?;
            Ok(Value::Str(chars[from..to].iter().collect()))
        }
        _ => Err(parameter_type()),
    }
}

// Negative indexes count from the end; a negative `to` is inclusive.
// An empty or out-of-bounds range is an error, never clamped.
fn sub_range(from: i64, to: i64, len: usize) -> Result<(usize, usize), Error> {
    let len = len as i64;
    let from = if from < 0 {
        if from < -len {
            return Err(Error::new("out of range"));
        }
        len + from
    } else {
        from
    };
    let to = if to < 0 {
        if to < -len {
            return Err(Error::new("out of range"));
        }
        len + to + 1
    } else {
        to
    };
    if from >= len || to > len || from >= to {
        return Err(Error::new("out of range"));
    }
    Ok((from as usize, to as usize))
}

fn contains(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Dict(entries) => {
            let key = DictKey::from_value(&args[1])?;
            Ok(Value::Bool(entries.borrow().contains_key(&key)))
        }
        Value::List(values) => {
            let len = values.borrow().len();
            index_in_bounds(&args[1], len)
        }
        Value::Vector(values) => {
            let len = values.borrow().len();
            index_in_bounds(&args[1], len)
        }
        Value::Str(s) => {
            let Value::Str(needle) = &args[1] else {
                return Err(parameter_type());
            };
            Ok(Value::Bool(s.contains(needle.as_str())))
        }
        _ => Err(parameter_type()),
    }
}

fn index_in_bounds(key: &Value, len: usize) -> Result<Value, Error> {
    let idx = key.as_int().ok_or_else(parameter_type)?;
    let resolved = if idx < 0 { idx + len as i64 } else { idx };
    Ok(Value::Bool(resolved >= 0 && resolved < len as i64))
}

fn update(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Dict(entries) => {
            let key = DictKey::from_value(&args[1])?;
            entries.borrow_mut().insert(key, args[2].clone());
        }
        Value::List(values) => {
            let mut values = values.borrow_mut();
            let idx = resolve_index(&args[1], values.len())?;
            values[idx] = args[2].clone();
        }
        Value::Vector(values) => {
            let mut values = values.borrow_mut();
            let idx = resolve_index(&args[1], values.len())?;
            values[idx] = args[2].as_float().ok_or_else(parameter_type)?;
        }
        _ => return Err(parameter_type()),
    }
    Ok(args[0].clone())
}

fn append(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::List(values) => {
            let mut res = values.borrow().clone();
            res.extend(args[1..].iter().cloned());
            Ok(Value::list(res))
        }
        Value::Vector(values) => {
            let mut res = values.borrow().clone();
            for arg in &args[1..] {
                res.push(arg.as_float().ok_or_else(parameter_type)?);
            }
            Ok(Value::vector(res))
        }
        _ => Err(parameter_type()),
    }
}

fn concat(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::List(values) => {
            if args.len() == 1 {
                return Ok(args[0].clone());
            }
            let mut res = values.borrow().clone();
            for arg in &args[1..] {
                let Value::List(more) = arg else {
                    return Err(parameter_type());
                };
                res.extend(more.borrow().iter().cloned());
            }
            Ok(Value::list(res))
        }
        Value::Vector(values) => {
            if args.len() == 1 {
                return Ok(args[0].clone());
            }
            let mut res = values.borrow().clone();
            for arg in &args[1..] {
                let Value::Vector(more) = arg else {
                    return Err(parameter_type());
                };
                res.extend(more.borrow().iter().copied());
            }
            Ok(Value::vector(res))
        }
        Value::Str(s) => {
            if args.len() == 1 {
                return Ok(args[0].clone());
            }
            let mut res = s.clone();
            for arg in &args[1..] {
                let Value::Str(more) = arg else {
                    return Err(parameter_type());
                };
                res.push_str(more);
            }
            Ok(Value::Str(res))
        }
        _ => Err(parameter_type()),
    }
}

fn merge(args: &[Value]) -> Result<Value, Error> {
    let mut res = IndexMap::new();
    for arg in args {
        let Value::Dict(entries) = arg else {
            return Err(parameter_type());
        };
        for (key, value) in entries.borrow().iter() {
            res.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::dict(res))
}

fn range(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::list(range_values(args)?))
}

fn vec_range(args: &[Value]) -> Result<Value, Error> {
    let mut res = Vec::new();
    for value in range_values(args)? {
        res.push(value.as_float().ok_or_else(parameter_type)?);
    }
    Ok(Value::vector(res))
}

fn range_values(args: &[Value]) -> Result<Vec<Value>, Error> {
    match (&args[0], &args[1], &args[2]) {
        (Value::Int(start), Value::Int(stop), Value::Int(step)) => {
            if *step == 0 {
                return Err(Error::new("invalid argument"));
            }
            let mut res = Vec::new();
            let mut n = *start;
            while (*step > 0 && n < *stop) || (*step < 0 && n > *stop) {
                res.push(Value::Int(n));
                n = match n.checked_add(*step) {
                    Some(next) => next,
                    None => break,
                };
            }
            Ok(res)
        }
        (Value::Float(start), Value::Float(stop), Value::Float(step)) => {
            if *step == 0.0 {
                return Err(Error::new("invalid argument"));
            }
            let mut res = Vec::new();
            let mut n = *start;
            while (*step > 0.0 && n < *stop) || (*step < 0.0 && n > *stop) {
                res.push(Value::Float(n));
                n += *step;
            }
            Ok(res)
        }
        _ => Err(parameter_type()),
    }
}

fn repeat(args: &[Value]) -> Result<Value, Error> {
    let n = count_arg(&args[0])?;
    Ok(Value::list(vec![args[1].clone(); n]))
}

fn vec_repeat(args: &[Value]) -> Result<Value, Error> {
    let n = count_arg(&args[0])?;
    let value = args[1].as_float().ok_or_else(parameter_type)?;
    Ok(Value::vector(vec![value; n]))
}

fn reverse(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::List(values) => {
            let mut res = values.borrow().clone();
            res.reverse();
            Ok(Value::list(res))
        }
        Value::Vector(values) => {
            let mut res = values.borrow().clone();
            res.reverse();
            Ok(Value::vector(res))
        }
        _ => Err(parameter_type()),
    }
}

fn skip(args: &[Value]) -> Result<Value, Error> {
    let n = args[0].as_int().ok_or_else(parameter_type)?.max(0) as usize;
    match &args[1] {
        Value::List(values) => {
            Ok(Value::list(values.borrow().iter().skip(n).cloned().collect()))
        }
        Value::Vector(values) => {
            Ok(Value::vector(values.borrow().iter().skip(n).copied().collect()))
        }
        _ => Err(parameter_type()),
    }
}

fn take(args: &[Value]) -> Result<Value, Error> {
    let n = args[0].as_int().ok_or_else(parameter_type)?.max(0) as usize;
    match &args[1] {
        Value::List(values) => {
            Ok(Value::list(values.borrow().iter().take(n).cloned().collect()))
        }
        Value::Vector(values) => {
            Ok(Value::vector(values.borrow().iter().take(n).copied().collect()))
        }
        _ => Err(parameter_type()),
    }
}

fn flatten(args: &[Value]) -> Result<Value, Error> {
    let mut res = Vec::new();
    flatten_into(args, &mut res);
    Ok(Value::list(res))
}

// Only nested lists unfold; vectors and dicts are leaves.
fn flatten_into(values: &[Value], out: &mut Vec<Value>) {
    for value in values {
        match value {
            Value::List(inner) => flatten_into(&inner.borrow(), out),
            other => out.push(other.clone()),
        }
    }
}

fn map(args: &[Value]) -> Result<Value, Error> {
    let callback = &args[0];
    let lists = column_lists(&args[1..])?;
    let mut res = Vec::with_capacity(lists[0].len());
    for i in 0..lists[0].len() {
        let call_args: Vec<Value> = lists.iter().map(|list| list[i].clone()).collect();
        res.push(apply(callback, &call_args)?);
    }
    Ok(Value::list(res))
}

fn map_indexed(args: &[Value]) -> Result<Value, Error> {
    let callback = &args[0];
    let lists = column_lists(&args[1..])?;
    let mut res = Vec::with_capacity(lists[0].len());
    for i in 0..lists[0].len() {
        let mut call_args = Vec::with_capacity(lists.len() + 1);
        call_args.push(Value::Int(i as i64));
        call_args.extend(lists.iter().map(|list| list[i].clone()));
        res.push(apply(callback, &call_args)?);
    }
    Ok(Value::list(res))
}

fn vec_map(args: &[Value]) -> Result<Value, Error> {
    let callback = &args[0];
    let columns = vector_columns(&args[1..])?;
    let mut res = Vec::with_capacity(columns[0].len());
    for i in 0..columns[0].len() {
        let call_args: Vec<Value> = columns.iter().map(|col| Value::Float(col[i])).collect();
        res.push(float_result(apply(callback, &call_args)?)?);
    }
    Ok(Value::vector(res))
}

fn vec_map_indexed(args: &[Value]) -> Result<Value, Error> {
    let callback = &args[0];
    let columns = vector_columns(&args[1..])?;
    let mut res = Vec::with_capacity(columns[0].len());
    for i in 0..columns[0].len() {
        let mut call_args = Vec::with_capacity(columns.len() + 1);
        call_args.push(Value::Int(i as i64));
        call_args.extend(columns.iter().map(|col| Value::Float(col[i])));
        res.push(float_result(apply(callback, &call_args)?)?);
    }
    Ok(Value::vector(res))
}

fn filter(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(Error::new("filter takes two arguments"));
    }
    let callback = &args[0];
    match &args[1] {
        Value::List(values) => {
            let values = values.borrow().clone();
            let mut res = Vec::new();
            for value in values {
                if callback_keeps(callback, &value)? {
                    res.push(value);
                }
            }
            Ok(Value::list(res))
        }
        Value::Vector(values) => {
            let values = values.borrow().clone();
            let mut res = Vec::new();
            for n in values {
                if callback_keeps(callback, &Value::Float(n))? {
                    res.push(n);
                }
            }
            Ok(Value::vector(res))
        }
        _ => Err(parameter_type()),
    }
}

fn count_if(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(Error::new("count-if takes two arguments"));
    }
    let callback = &args[0];
    let items = sequence_values(&args[1])?;
    let mut count = 0i64;
    for value in &items {
        if callback_keeps(callback, value)? {
            count += 1;
        }
    }
    Ok(Value::Int(count))
}

fn apply_to(args: &[Value]) -> Result<Value, Error> {
    if !args[0].is_callable() {
        return Err(parameter_type());
    }
    let call_args = sequence_values(&args[1])?;
    apply(&args[0], &call_args)
}

fn vec_apply(args: &[Value]) -> Result<Value, Error> {
    if !args[0].is_callable() {
        return Err(parameter_type());
    }
    let Value::Vector(values) = &args[1] else {
        return Err(parameter_type());
    };
    let call_args: Vec<Value> = values.borrow().iter().map(|n| Value::Float(*n)).collect();
    apply(&args[0], &call_args)
}

fn sort_asc(args: &[Value]) -> Result<Value, Error> {
    sort_by_comparator(args, false)
}

fn sort_desc(args: &[Value]) -> Result<Value, Error> {
    sort_by_comparator(args, true)
}

fn sort_by_comparator(args: &[Value], descending: bool) -> Result<Value, Error> {
    let callback = &args[0];
    let less = |a: &Value, b: &Value| -> Result<bool, Error> {
        let (a, b) = if descending { (b, a) } else { (a, b) };
        comparator_result(apply(callback, &[a.clone(), b.clone()])?)
    };
    match &args[1] {
        Value::List(values) => {
            let mut res = values.borrow().clone();
            insertion_sort(&mut res, less)?;
            Ok(Value::list(res))
        }
        Value::Vector(values) => {
            let mut res = values.borrow().clone();
            insertion_sort(&mut res, |a: &f64, b: &f64| {
                less(&Value::Float(*a), &Value::Float(*b))
            })?;
            Ok(Value::vector(res))
        }
        _ => Err(parameter_type()),
    }
}

fn sort_index(args: &[Value]) -> Result<Value, Error> {
    let callback = &args[0];
    let items = sequence_values(&args[1])?;
    let mut idx: Vec<usize> = (0..items.len()).collect();
    insertion_sort(&mut idx, |a, b| {
        comparator_result(apply(callback, &[items[*a].clone(), items[*b].clone()])?)
    })?;
    Ok(Value::list(idx.into_iter().map(|i| Value::Int(i as i64)).collect()))
}

fn bind(args: &[Value]) -> Result<Value, Error> {
    if args.len() < 2 {
        return Err(Error::new("bind takes 2 or more arguments"));
    }
    let callback = args[0].clone();
    if !callback.is_callable() {
        return Err(Error::new("first argument must be callable"));
    }
    let bound = args[1..].to_vec();
    Ok(Value::native(move |args: &[Value]| {
        let mut call_args = bound.clone();
        call_args.extend(args.iter().cloned());
        apply(&callback, &call_args)
    }))
}

fn repeatedly(args: &[Value]) -> Result<Value, Error> {
    let n = count_arg(&args[0])?;
    if !args[1].is_callable() {
        return Err(Error::new("repeatedly takes a function as second parameter"));
    }
    let mut res = Vec::with_capacity(n);
    for _ in 0..n {
        res.push(apply(&args[1], &[])?);
    }
    Ok(Value::list(res))
}

fn thread(args: &[Value]) -> Result<Value, Error> {
    let Some((first, rest)) = args.split_first() else {
        return Err(Error::new("-> takes 1 or more arguments"));
    };
    let mut value = first.clone();
    for callback in rest {
        value = apply(callback, &[value])?;
    }
    Ok(value)
}

// Fold over arguments a base-type adapter has already unified; the
// first argument seeds the accumulator.
fn fold_scalars(
    args: &[Value],
    int_op: fn(i64, i64) -> Result<i64, Error>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, Error> {
    match &args[0] {
        Value::Int(first) => {
            let mut acc = *first;
            for arg in &args[1..] {
                let Value::Int(n) = arg else {
                    return Err(parameter_type());
                };
                acc = int_op(acc, *n)?;
            }
            Ok(Value::Int(acc))
        }
        Value::Float(first) => {
            let mut acc = *first;
            for arg in &args[1..] {
                let Value::Float(n) = arg else {
                    return Err(parameter_type());
                };
                acc = float_op(acc, *n);
            }
            Ok(Value::Float(acc))
        }
        _ => Err(parameter_type()),
    }
}

fn fold_vectors(args: &[Value], op: fn(f64, f64) -> f64) -> Result<Value, Error> {
    let Value::Vector(first) = &args[0] else {
        return Err(parameter_type());
    };
    let mut acc = first.borrow().clone();
    for arg in &args[1..] {
        let Value::Vector(values) = arg else {
            return Err(parameter_type());
        };
        let values = values.borrow();
        if values.len() != acc.len() {
            return Err(Error::new("vectors of different length"));
        }
        for (slot, n) in acc.iter_mut().zip(values.iter()) {
            *slot = op(*slot, *n);
        }
    }
    Ok(Value::vector(acc))
}

fn sequence_values(value: &Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::List(values) => Ok(values.borrow().clone()),
        Value::Vector(values) => {
            Ok(values.borrow().iter().map(|n| Value::Float(*n)).collect())
        }
        _ => Err(parameter_type()),
    }
}

fn column_lists(args: &[Value]) -> Result<Vec<Vec<Value>>, Error> {
    let mut lists = Vec::with_capacity(args.len());
    for arg in args {
        lists.push(sequence_values(arg)?);
    }
    let len = lists[0].len();
    if lists.iter().any(|list| list.len() != len) {
        return Err(Error::new("lists must be of same length"));
    }
    Ok(lists)
}

fn vector_columns(args: &[Value]) -> Result<Vec<Vec<f64>>, Error> {
    let mut columns = Vec::with_capacity(args.len());
    for arg in args {
        let Value::Vector(values) = arg else {
            return Err(parameter_type());
        };
        columns.push(values.borrow().clone());
    }
    let len = columns[0].len();
    if columns.iter().any(|col| col.len() != len) {
        return Err(Error::new("lists must be of same length"));
    }
    Ok(columns)
}

fn callback_keeps(callback: &Value, value: &Value) -> Result<bool, Error> {
    match apply(callback, std::slice::from_ref(value))? {
        Value::Bool(b) => Ok(b),
        _ => Err(Error::new("callback must return bool")),
    }
}

fn comparator_result(value: Value) -> Result<bool, Error> {
    match value {
        Value::Bool(b) => Ok(b),
        _ => Err(Error::new("callback must return bool")),
    }
}

fn float_result(value: Value) -> Result<f64, Error> {
    match value {
        Value::Float(n) => Ok(n),
        _ => Err(Error::new("expected function to return float")),
    }
}

fn count_arg(value: &Value) -> Result<usize, Error> {
    let n = value.as_int().ok_or_else(parameter_type)?;
    usize::try_from(n).map_err(|_| parameter_type())
}

// Stable, and bails out as soon as the comparator fails.
fn insertion_sort<T>(
    items: &mut [T],
    mut less: impl FnMut(&T, &T) -> Result<bool, Error>,
) -> Result<(), Error> {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && less(&items[j], &items[j - 1])? {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
    Ok(())
}
