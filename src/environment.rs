use std::{cell::RefCell, io, io::Write, rc::Rc};

use indexmap::IndexMap;

use crate::{ast::SourceSetRef, diagnostics::Error, value::Value};

pub type ScopeRef = Rc<RefCell<Scope>>;

/// Sink for `printf` and `time` output; defaults to stdout.
pub type OutRef = Rc<RefCell<dyn Write>>;

/// A lexical scope: a symbol table chained to an optional parent.
/// Root scopes are produced by module bootstrap, children by `branch`.
pub struct Scope {
    parent: Option<ScopeRef>,
    vars: IndexMap<String, Value>,
    sources: SourceSetRef,
    out: Option<OutRef>,
}

impl Scope {
    pub fn root(sources: SourceSetRef) -> ScopeRef {
        Rc::new(RefCell::new(Self {
            parent: None,
            vars: IndexMap::new(),
            sources,
            out: None,
        }))
    }

    /// Returns a child scope with an empty table.
    pub fn branch(scope: &ScopeRef) -> ScopeRef {
        let (sources, out) = {
            let s = scope.borrow();
            (s.sources.clone(), s.out.clone())
        };
        Rc::new(RefCell::new(Self {
            parent: Some(scope.clone()),
            vars: IndexMap::new(),
            sources,
            out,
        }))
    }

    /// Defines a new symbol in this scope. Shadowing an ancestor is
    /// allowed; redefining within the same scope is an error.
    pub fn create(scope: &ScopeRef, name: &str, value: Value) -> Result<(), Error> {
        let mut s = scope.borrow_mut();
        if s.vars.contains_key(name) {
            return Err(Error::new(format!(
                "symbol already defined in current scope: {name}"
            )));
        }
        s.vars.insert(name.to_string(), value);
        Ok(())
    }

    /// Sets a symbol in the shallowest scope that defines it.
    pub fn set(scope: &ScopeRef, name: &str, value: Value) -> Result<(), Error> {
        if scope.borrow().vars.contains_key(name) {
            scope.borrow_mut().vars.insert(name.to_string(), value);
            return Ok(());
        }
        if let Some(parent) = scope.borrow().parent.clone() {
            return Scope::set(&parent, name, value);
        }
        Err(Error::new(format!("cannot set undefined symbol: {name}")))
    }

    pub fn set_or_create(scope: &ScopeRef, name: &str, value: Value) {
        if Scope::set(scope, name, value.clone()).is_err() {
            let _ = Scope::create(scope, name, value);
        }
    }

    /// Resolves a symbol in the shallowest scope that defines it.
    pub fn get(scope: &ScopeRef, name: &str) -> Result<Value, Error> {
        match Scope::lookup(scope, name) {
            Some(value) => Ok(value),
            None => Err(Error::new(format!("undefined symbol: {name}"))),
        }
    }

    pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
        if let Some(value) = scope.borrow().vars.get(name) {
            return Some(value.clone());
        }
        let parent = scope.borrow().parent.clone();
        parent.and_then(|parent| Scope::lookup(&parent, name))
    }

    pub fn sources(scope: &ScopeRef) -> SourceSetRef {
        scope.borrow().sources.clone()
    }

    pub fn redirect_output(scope: &ScopeRef, out: OutRef) {
        scope.borrow_mut().out = Some(out);
    }

    /// Writes through the redirected sink when one is installed.
    pub fn print(scope: &ScopeRef, text: &str) -> Result<(), Error> {
        let out = scope.borrow().out.clone();
        let res = match out {
            Some(out) => out.borrow_mut().write_all(text.as_bytes()),
            None => io::stdout().write_all(text.as_bytes()),
        };
        res.map_err(|err| Error::new(err.to_string()))
    }
}
