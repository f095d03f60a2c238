use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{adapters::Adapter, ast::Node, diagnostics::Error, environment::ScopeRef};

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type VectorRef = Rc<RefCell<Vec<f64>>>;
pub type DictRef = Rc<RefCell<IndexMap<DictKey, Value>>>;
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, Error>>;
pub type SpecialFn = Rc<dyn Fn(&ScopeRef, &[Node]) -> Result<Value, Error>>;

/// A runtime value. Scalars are owned; containers are shared handles,
/// so aliases observe in-place mutation (`update!`).
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(ListRef),
    Vector(VectorRef),
    Dict(DictRef),
    Native(NativeFn),
    Special(SpecialFn),
    Closure(Rc<Closure>),
}

/// A language-defined function: captured scope, parameter names, body.
pub struct Closure {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Node>,
    pub env: ScopeRef,
}

impl Value {
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn vector(values: Vec<f64>) -> Self {
        Value::Vector(Rc::new(RefCell::new(values)))
    }

    pub fn dict(entries: IndexMap<DictKey, Value>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Error> + 'static,
    {
        Value::Native(Rc::new(f))
    }

    /// Builds a native whose arguments are passed through `adapters`,
    /// in order, before `f` runs.
    pub fn native_with<F>(adapters: Vec<Adapter>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Error> + 'static,
    {
        Value::Native(Rc::new(move |args: &[Value]| {
            let mut args = args.to_vec();
            for adapter in &adapters {
                args = adapter.apply(args)?;
            }
            f(&args)
        }))
    }

    pub fn special<F>(f: F) -> Self
    where
        F: Fn(&ScopeRef, &[Node]) -> Result<Value, Error> + 'static,
    {
        Value::Special(Rc::new(f))
    }

    pub fn closure(
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Node>,
        env: ScopeRef,
    ) -> Self {
        Value::Closure(Rc::new(Closure {
            name,
            params,
            body,
            env,
        }))
    }

    /// Only `false` is falsy; `nil`, `0`, `""` and empty containers
    /// all count as true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Dict(_) => "dict",
            Value::Native(_) | Value::Closure(_) => "function",
            Value::Special(_) => "special form",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Native(_) | Value::Special(_) | Value::Closure(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric accessor; ints promote.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<ListRef> {
        match self {
            Value::List(l) => Some(l.clone()),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<VectorRef> {
        match self {
            Value::Vector(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<DictRef> {
        match self {
            Value::Dict(d) => Some(d.clone()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Structural equality. `42` and `42.0` differ, `NaN` never equals
    /// itself, functions never compare equal.
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => *a.borrow() == *b.borrow(),
            (Value::Vector(a), Value::Vector(b)) => *a.borrow() == *b.borrow(),
            (Value::Dict(a), Value::Dict(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).map_or(false, |w| v == w))
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::vector(values)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::list(values)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(values) => {
                write!(f, "[")?;
                for (idx, value) in values.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Vector(values) => {
                write!(f, "[")?;
                for (idx, value) in values.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in entries.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key} {value}")?;
                }
                write!(f, "}}")
            }
            Value::Native(_) => write!(f, "<native fn>"),
            Value::Special(_) => write!(f, "<special form>"),
            Value::Closure(c) => match &c.name {
                Some(name) => write!(f, "<func {name}>"),
                None => write!(f, "<func>"),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(n) => write!(f, "{n:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(values) => {
                write!(f, "[")?;
                for (idx, value) in values.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{value:?}")?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in entries.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key:?} {value:?}")?;
                }
                write!(f, "}}")
            }
            other => write!(f, "{other}"),
        }
    }
}

/// The hashable scalar subset usable as a dict key. Floats key by bit
/// pattern with `-0.0` and NaN normalized.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Nil,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
}

impl DictKey {
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Nil => Ok(DictKey::Nil),
            Value::Bool(b) => Ok(DictKey::Bool(*b)),
            Value::Int(n) => Ok(DictKey::Int(*n)),
            Value::Float(n) => Ok(DictKey::Float(normalize_key_bits(*n))),
            Value::Str(s) => Ok(DictKey::Str(s.clone())),
            other => Err(Error::new(format!(
                "cannot use {other:?} as a dict key"
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DictKey::Nil => Value::Nil,
            DictKey::Bool(b) => Value::Bool(*b),
            DictKey::Int(n) => Value::Int(*n),
            DictKey::Float(bits) => Value::Float(f64::from_bits(*bits)),
            DictKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

fn normalize_key_bits(n: f64) -> u64 {
    if n == 0.0 {
        0.0f64.to_bits()
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

impl fmt::Display for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Debug for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_value())
    }
}
