use crate::{diagnostics::Error, value::Value};

pub fn wrong_arity() -> Error {
    Error::new("wrong number of parameters")
}

pub fn parameter_type() -> Error {
    Error::new("error in parameter type")
}

/// Argument-list transform applied before a native function runs.
/// Adapters compose in declaration order; the first failure aborts
/// the call.
#[derive(Clone, Copy)]
pub enum Adapter {
    /// Exactly `n` arguments.
    Arity(usize),
    /// At least `n` arguments.
    AtLeast(usize),
    /// An even argument count, for key/value style natives.
    EvenArity,
    /// An odd argument count.
    OddArity,
    /// Unifies scalars: all strings, or ints promoted once any float
    /// is present. Mixing strings with anything else is an error.
    SameBaseType,
    /// Argument `p`, when present, must be numeric; converted to float.
    FloatAt(usize),
    /// Argument `p`, when present, must be numeric; truncated to int.
    IntAt(usize),
    /// Broadcasts numeric scalars to vectors when any argument is a
    /// vector. Length agreement is left to the consuming function.
    Slicify,
}

impl Adapter {
    pub fn apply(&self, mut args: Vec<Value>) -> Result<Vec<Value>, Error> {
        match self {
            Adapter::Arity(n) => {
                if args.len() != *n {
                    return Err(wrong_arity());
                }
                Ok(args)
            }
            Adapter::AtLeast(n) => {
                if args.len() < *n {
                    return Err(wrong_arity());
                }
                Ok(args)
            }
            Adapter::EvenArity => {
                if args.len() % 2 != 0 {
                    return Err(wrong_arity());
                }
                Ok(args)
            }
            Adapter::OddArity => {
                if args.len() % 2 != 1 {
                    return Err(wrong_arity());
                }
                Ok(args)
            }
            Adapter::SameBaseType => {
                if args.iter().any(|v| matches!(v, Value::Str(_))) {
                    if !args.iter().all(|v| matches!(v, Value::Str(_))) {
                        return Err(parameter_type());
                    }
                    return Ok(args);
                }
                if args.iter().any(|v| matches!(v, Value::Float(_))) {
                    for arg in &mut args {
                        if let Value::Int(n) = arg {
                            *arg = Value::Float(*n as f64);
                        }
                    }
                }
                Ok(args)
            }
            Adapter::FloatAt(p) => {
                if let Some(slot) = args.get_mut(*p) {
                    match slot {
                        Value::Float(_) => {}
                        Value::Int(n) => *slot = Value::Float(*n as f64),
                        _ => return Err(parameter_type()),
                    }
                }
                Ok(args)
            }
            Adapter::IntAt(p) => {
                if let Some(slot) = args.get_mut(*p) {
                    match slot {
                        Value::Int(_) => {}
                        Value::Float(f) => *slot = Value::Int(*f as i64),
                        _ => return Err(parameter_type()),
                    }
                }
                Ok(args)
            }
            Adapter::Slicify => {
                let len = match args.iter().find(|v| matches!(v, Value::Vector(_))) {
                    Some(Value::Vector(v)) => v.borrow().len(),
                    _ => return Ok(args),
                };
                for arg in &mut args {
                    match arg {
                        Value::Vector(_) => {}
                        Value::Int(n) => *arg = Value::vector(vec![*n as f64; len]),
                        Value::Float(f) => *arg = Value::vector(vec![*f; len]),
                        _ => return Err(parameter_type()),
                    }
                }
                Ok(args)
            }
        }
    }
}
