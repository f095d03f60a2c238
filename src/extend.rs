use indexmap::IndexMap;

use crate::{
    adapters::parameter_type,
    diagnostics::Error,
    runtime::{Env, Program},
    value::Value,
};

/// Keyed value storage an [`Extender`] reads from and writes to.
pub trait Store {
    fn get(&self, id: &str) -> Option<Value>;
    fn set(&mut self, id: &str, value: Value);
}

impl Store for IndexMap<String, Value> {
    fn get(&self, id: &str) -> Option<Value> {
        IndexMap::get(self, id).cloned()
    }

    fn set(&mut self, id: &str, value: Value) {
        self.insert(id.to_string(), value);
    }
}

/// Computes the value for one id from values already in a store.
pub trait Extender {
    fn id(&self) -> &str;
    fn describe(&self) -> String;
    /// Ids this extender still needs before it can run. Empty means
    /// ready (or already present).
    fn missing(&self, store: &dyn Store) -> Result<Vec<String>, Error>;
    fn extend(&self, store: &mut dyn Store) -> Result<(), Error>;
}

/// Runs `extenders` to a fixpoint, in passes: each pass runs every
/// extender whose dependencies are all present and carries the rest
/// over. A dependency no extender produces and the store does not hold
/// is an error, as is a pass that makes no progress (a dependency
/// cycle).
pub fn extend(store: &mut dyn Store, extenders: &[&dyn Extender]) -> Result<(), Error> {
    let mut pending: Vec<&dyn Extender> = extenders.to_vec();
    while !pending.is_empty() {
        let mut carried: Vec<&dyn Extender> = Vec::new();
        let mut blocked: Vec<String> = Vec::new();
        for extender in &pending {
            if store.get(extender.id()).is_some() {
                continue;
            }
            let missing = extender.missing(store)?;
            if missing.is_empty() {
                extender.extend(store)?;
            } else {
                blocked.extend(missing);
                carried.push(*extender);
            }
        }
        for id in &blocked {
            if store.get(id).is_none() && !extenders.iter().any(|e| e.id() == id) {
                return Err(Error::new(format!("missing extender for {id}")));
            }
        }
        if carried.len() == pending.len() {
            let ids: Vec<&str> = carried.iter().map(|e| e.id()).collect();
            return Err(Error::new(format!(
                "unresolvable dependencies: {}",
                ids.join(", ")
            )));
        }
        pending = carried;
    }
    Ok(())
}

/// Extender that evaluates an expression; its dependencies are the
/// expression's unresolved symbols, injected from the store as
/// variables at evaluation time.
pub struct ExprExtender {
    id: String,
    program: Program,
    env: Env,
    elementwise: bool,
}

impl ExprExtender {
    pub fn new(id: impl Into<String>, expr: &str, env: &Env) -> Result<Self, Error> {
        Ok(Self {
            id: id.into(),
            program: Program::new(expr)?,
            env: env.clone(),
            elementwise: false,
        })
    }

    /// Variant whose dependencies are equal-length float vectors; the
    /// expression runs once per index over scalar bindings and the
    /// results collect into a vector.
    pub fn elementwise(id: impl Into<String>, expr: &str, env: &Env) -> Result<Self, Error> {
        Ok(Self {
            id: id.into(),
            program: Program::new(expr)?,
            env: env.clone(),
            elementwise: true,
        })
    }

    fn extend_whole(&self, store: &mut dyn Store) -> Result<(), Error> {
        let mut env = self.env.clone();
        for name in self.program.missing(&env)? {
            let value = store
                .get(&name)
                .ok_or_else(|| Error::new(format!("missing var {name}")))?;
            env.add_var(name, value);
        }
        let value = self.program.eval(&env)?;
        store.set(&self.id, value);
        Ok(())
    }

    fn extend_elementwise(&self, store: &mut dyn Store) -> Result<(), Error> {
        let needed = self.program.missing(&self.env)?;
        let mut columns = Vec::with_capacity(needed.len());
        let mut len = None;
        for name in needed {
            let value = store
                .get(&name)
                .ok_or_else(|| Error::new(format!("missing var {name}")))?;
            let values = value.as_vector().ok_or_else(parameter_type)?;
            let values = values.borrow().clone();
            match len {
                Some(len) if len != values.len() => {
                    return Err(Error::new("vectors of different length"));
                }
                _ => len = Some(values.len()),
            }
            columns.push((name, values));
        }
        let len = len.unwrap_or(0);
        let mut res = Vec::with_capacity(len);
        for i in 0..len {
            let mut env = self.env.clone();
            for (name, values) in &columns {
                env.add_var(name.clone(), Value::Float(values[i]));
            }
            let value = self.program.eval(&env)?;
            let n = value
                .as_float()
                .ok_or_else(|| Error::new("expression must yield a number"))?;
            res.push(n);
        }
        store.set(&self.id, Value::vector(res));
        Ok(())
    }
}

impl Extender for ExprExtender {
    fn id(&self) -> &str {
        &self.id
    }

    fn describe(&self) -> String {
        self.program.code().to_string()
    }

    fn missing(&self, store: &dyn Store) -> Result<Vec<String>, Error> {
        if store.get(&self.id).is_some() {
            return Ok(Vec::new());
        }
        let needed = self.program.missing(&self.env)?;
        Ok(needed
            .into_iter()
            .filter(|name| store.get(name).is_none())
            .collect())
    }

    fn extend(&self, store: &mut dyn Store) -> Result<(), Error> {
        if store.get(&self.id).is_some() {
            return Ok(());
        }
        if self.elementwise {
            self.extend_elementwise(store)
        } else {
            self.extend_whole(store)
        }
    }
}

/// Extender backed by a host closure over its fetched dependencies.
pub struct FnExtender {
    id: String,
    deps: Vec<String>,
    f: Box<dyn Fn(&[Value]) -> Result<Value, Error>>,
}

impl FnExtender {
    pub fn new(
        id: impl Into<String>,
        deps: Vec<String>,
        f: impl Fn(&[Value]) -> Result<Value, Error> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            deps,
            f: Box::new(f),
        }
    }
}

impl Extender for FnExtender {
    fn id(&self) -> &str {
        &self.id
    }

    fn describe(&self) -> String {
        format!("fn({})", self.deps.join(" "))
    }

    fn missing(&self, store: &dyn Store) -> Result<Vec<String>, Error> {
        if store.get(&self.id).is_some() {
            return Ok(Vec::new());
        }
        Ok(self
            .deps
            .iter()
            .filter(|dep| store.get(dep).is_none())
            .cloned()
            .collect())
    }

    fn extend(&self, store: &mut dyn Store) -> Result<(), Error> {
        if store.get(&self.id).is_some() {
            return Ok(());
        }
        let mut fetched = Vec::with_capacity(self.deps.len());
        for dep in &self.deps {
            let value = store
                .get(dep)
                .ok_or_else(|| Error::new(format!("missing var {dep}")))?;
            fetched.push(value);
        }
        let value = (self.f)(&fetched)?;
        store.set(&self.id, value);
        Ok(())
    }
}
