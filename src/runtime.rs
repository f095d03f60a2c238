use indexmap::IndexMap;

use crate::{
    adapters::parameter_type,
    ast::{Node, NodeKind, SourceSet, SourceSetRef},
    diagnostics::{Error, Position},
    environment::{OutRef, Scope, ScopeRef},
    modules::Module,
    parser, prelude, series, stdlib,
    value::{Closure, DictKey, Value},
};

/// Evaluates a node in the given scope. Errors pick up the position of
/// the node being evaluated the first time they cross this boundary.
pub fn eval(scope: &ScopeRef, node: &Node) -> Result<Value, Error> {
    match &node.kind {
        NodeKind::Symbol(name) => {
            Scope::get(scope, name).map_err(|err| err.with_pos(position(scope, node)))
        }
        NodeKind::Int(n) => Ok(Value::Int(*n)),
        NodeKind::Float(n) => Ok(Value::Float(*n)),
        NodeKind::Str(s) => Ok(Value::Str(s.clone())),
        NodeKind::List(nodes) => eval_call(scope, nodes),
        NodeKind::ListList(nodes) => {
            let mut values = Vec::with_capacity(nodes.len());
            for node in nodes {
                values.push(eval(scope, node)?);
            }
            Ok(Value::list(values))
        }
        NodeKind::DictList(nodes) => {
            let mut values = Vec::with_capacity(nodes.len());
            for node in nodes {
                values.push(eval(scope, node)?);
            }
            dict_from_pairs(&values).map_err(|err| err.with_pos(position(scope, node)))
        }
        NodeKind::Root(nodes) => {
            let mut value = Value::Nil;
            for node in nodes {
                value = eval(scope, node).map_err(|err| err.with_pos(position(scope, node)))?;
            }
            Ok(value)
        }
    }
}

fn eval_call(scope: &ScopeRef, nodes: &[Node]) -> Result<Value, Error> {
    let Some((head, tail)) = nodes.split_first() else {
        return Ok(Value::list(Vec::new()));
    };
    let target = eval(scope, head).map_err(|err| err.with_pos(position(scope, head)))?;
    if let Value::Special(form) = &target {
        return form(scope, tail).map_err(|err| err.with_pos(position(scope, head)));
    }
    let mut args = Vec::with_capacity(tail.len());
    for node in tail {
        args.push(eval(scope, node)?);
    }
    apply(&target, &args).map_err(|err| err.with_pos(position(scope, head)))
}

/// Applies an evaluated head value to evaluated arguments. Strings,
/// dicts, lists, and vectors in call position are reinterpreted as
/// lookups; anything else that is not callable is an error.
pub fn apply(target: &Value, args: &[Value]) -> Result<Value, Error> {
    match target {
        Value::Native(f) => f(args),
        Value::Closure(closure) => call_closure(closure, args),
        Value::Str(key) => {
            if args.len() != 1 {
                return Err(Error::new("lookup using string requires a dictionary"));
            }
            match &args[0] {
                Value::Dict(_) => container_get(&args[0], &Value::Str(key.clone())),
                _ => Err(Error::new("lookup using string requires a dictionary")),
            }
        }
        Value::Dict(_) | Value::List(_) | Value::Vector(_) => {
            if args.len() != 1 {
                return Err(Error::new("lookup requires a key"));
            }
            container_get(target, &args[0])
        }
        other => Err(Error::new(format!("cannot use {other:?} as a function"))),
    }
}

fn call_closure(closure: &Closure, args: &[Value]) -> Result<Value, Error> {
    if args.len() != closure.params.len() {
        return Err(Error::new(closure_arity(closure)));
    }
    let scope = Scope::branch(&closure.env);
    for (param, value) in closure.params.iter().zip(args) {
        Scope::create(&scope, param, value.clone())?;
    }
    let mut value = Value::Nil;
    for node in &closure.body {
        value = eval(&scope, node)?;
    }
    Ok(value)
}

fn closure_arity(closure: &Closure) -> String {
    let who = match &closure.name {
        Some(name) => format!("function \"{name}\""),
        None => "anonymous function".to_string(),
    };
    match closure.params.len() {
        0 => format!("{who} takes no arguments"),
        1 => format!("{who} takes one argument"),
        n => format!("{who} takes {n} arguments"),
    }
}

/// Index/key lookup shared by the `get` builtin and call-position
/// container lookups. Dict misses are `key not found`; sequence misses,
/// including negative overshoot, are `out of range`.
pub(crate) fn container_get(container: &Value, key: &Value) -> Result<Value, Error> {
    match container {
        Value::Dict(entries) => {
            let key = DictKey::from_value(key)?;
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::new("key not found"))
        }
        Value::List(values) => {
            let values = values.borrow();
            let idx = resolve_index(key, values.len())?;
            Ok(values[idx].clone())
        }
        Value::Vector(values) => {
            let values = values.borrow();
            let idx = resolve_index(key, values.len())?;
            Ok(Value::Float(values[idx]))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = resolve_index(key, chars.len())?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        _ => Err(parameter_type()),
    }
}

/// Resolves an integer key against a sequence length, counting
/// negative indexes from the end.
pub(crate) fn resolve_index(key: &Value, len: usize) -> Result<usize, Error> {
    let idx = key.as_int().ok_or_else(parameter_type)?;
    let resolved = if idx < 0 { idx + len as i64 } else { idx };
    if resolved < 0 || resolved >= len as i64 {
        return Err(Error::new("out of range"));
    }
    Ok(resolved as usize)
}

/// Builds a dict from a flat key/value sequence. Shared by brace
/// literals and the `dict` builtin.
pub(crate) fn dict_from_pairs(values: &[Value]) -> Result<Value, Error> {
    if values.len() % 2 != 0 {
        return Err(Error::new("dict requires an even number of arguments"));
    }
    let mut entries = IndexMap::new();
    for pair in values.chunks_exact(2) {
        entries.insert(DictKey::from_value(&pair[0])?, pair[1].clone());
    }
    Ok(Value::dict(entries))
}

fn position(scope: &ScopeRef, node: &Node) -> Position {
    Scope::sources(scope).borrow().position(node.span.start)
}

/// Walks a tree without evaluating it, collecting the symbols the scope
/// cannot resolve. `(var x ...)` forms pre-declare their name for the
/// rest of the walk; bracket and brace literals are not descended.
/// Duplicates are preserved, in depth-first source order.
fn missing_symbols(scope: &ScopeRef, node: &Node, out: &mut Vec<String>) {
    match &node.kind {
        NodeKind::Symbol(name) => {
            if Scope::lookup(scope, name).is_none() {
                out.push(name.clone());
            }
        }
        NodeKind::List(nodes) => {
            if let [Node {
                kind: NodeKind::Symbol(head),
                ..
            }, Node {
                kind: NodeKind::Symbol(name),
                ..
            }, rest @ ..] = nodes.as_slice()
            {
                if head == "var" {
                    if Scope::lookup(scope, name).is_none() {
                        let _ = Scope::create(scope, name, Value::Nil);
                    }
                    for node in rest {
                        missing_symbols(scope, node, out);
                    }
                    return;
                }
            }
            for node in nodes {
                missing_symbols(scope, node, out);
            }
        }
        NodeKind::Root(nodes) => {
            for node in nodes {
                missing_symbols(scope, node, out);
            }
        }
        _ => {}
    }
}

/// The variables and modules available to an evaluation. An `Env` is a
/// recipe, not a live scope: every `Program::eval` bootstraps a fresh
/// root scope from it, so evaluations never share mutable state through
/// the environment.
#[derive(Clone)]
pub struct Env {
    vars: IndexMap<String, Value>,
    modules: Vec<Module>,
}

impl Env {
    /// An environment with the standard modules (core, prelude, series).
    pub fn new() -> Self {
        let mut env = Self::bare();
        env.add_module(stdlib::core_module());
        env.add_module(prelude::module());
        env.add_module(series::module());
        env
    }

    /// An environment with no modules at all, for hosts that want
    /// complete control over the visible names.
    pub fn bare() -> Self {
        Self {
            vars: IndexMap::new(),
            modules: Vec::new(),
        }
    }

    /// Registers a variable, overriding any module binding of the same
    /// name. Later registrations win.
    pub fn add_var(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn add_module(&mut self, module: Module) {
        self.modules.push(module);
    }

    /// Bootstraps a root scope: every module's natives first (later
    /// modules win), then each module's language-defined functions and
    /// scripts in order, then the registered variables. Any parse or
    /// evaluation failure poisons the whole construction.
    pub(crate) fn scope(&self, sources: &SourceSetRef) -> Result<ScopeRef, Error> {
        let scope = Scope::root(sources.clone());
        for module in &self.modules {
            for (name, value) in module.natives() {
                Scope::set_or_create(&scope, name, value.clone());
            }
        }
        for module in &self.modules {
            for (name, source) in module.lisp_funcs() {
                let snippet = format!("(var {name} {source})");
                let node = parser::parse(sources, &format!("{}:{name}", module.name()), &snippet)?;
                eval(&scope, &node)?;
            }
            for source in module.scripts() {
                let node = parser::parse(sources, &format!("{}:script", module.name()), source)?;
                eval(&scope, &node)?;
            }
        }
        for (name, value) in &self.vars {
            Scope::set_or_create(&scope, name, value.clone());
        }
        Ok(scope)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed program, ready for evaluation against any environment. The
/// program owns its source registry, so error positions from repeated
/// evaluations stay stable.
pub struct Program {
    source: String,
    sources: SourceSetRef,
    node: Node,
    out: Option<OutRef>,
}

impl Program {
    pub fn new(source: &str) -> Result<Self, Error> {
        Self::with_name(source, "")
    }

    /// Parses `source`, attributing errors to `name` (empty means the
    /// default snippet name).
    pub fn with_name(source: &str, name: &str) -> Result<Self, Error> {
        let sources = SourceSet::new();
        let node = parser::parse(&sources, name, source)?;
        Ok(Self {
            source: source.to_string(),
            sources,
            node,
            out: None,
        })
    }

    /// The original source text.
    pub fn code(&self) -> &str {
        &self.source
    }

    /// Sends `printf` and `time` output to `out` instead of stdout.
    pub fn redirect_output(&mut self, out: OutRef) {
        self.out = Some(out);
    }

    /// Evaluates the program in a scope bootstrapped from `env`.
    pub fn eval(&self, env: &Env) -> Result<Value, Error> {
        let scope = env.scope(&self.sources)?;
        if let Some(out) = &self.out {
            Scope::redirect_output(&scope, out.clone());
        }
        eval(&scope, &self.node)
    }

    /// Reports the free symbols of the program: names that a scope
    /// bootstrapped from `env` does not define. The program evaluates
    /// cleanly only if this comes back empty (barring runtime errors).
    pub fn missing(&self, env: &Env) -> Result<Vec<String>, Error> {
        let scope = env.scope(&self.sources)?;
        let mut out = Vec::new();
        missing_symbols(&scope, &self.node, &mut out);
        Ok(out)
    }
}

/// Parses and evaluates `source` against the standard environment.
pub fn eval_str(source: &str) -> Result<Value, Error> {
    eval_str_env(source, &Env::new())
}

/// Parses and evaluates `source` against a caller-supplied environment.
pub fn eval_str_env(source: &str, env: &Env) -> Result<Value, Error> {
    Program::new(source)?.eval(env)
}
