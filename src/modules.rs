use crate::value::Value;

/// A named bundle of bindings installed into fresh root scopes.
///
/// A module carries three kinds of entries, installed in this order
/// during bootstrap: host natives (inserted directly into the scope
/// table), language-defined functions (source text bound by evaluating
/// `(var <name> <source>)`), and scripts (source evaluated for side
/// effects). Within each kind, entries keep the order they were added.
#[derive(Clone, Default)]
pub struct Module {
    name: String,
    natives: Vec<(String, Value)>,
    lisp_funcs: Vec<(String, String)>,
    scripts: Vec<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a host value (function, special form, or constant).
    pub fn native(mut self, name: impl Into<String>, value: Value) -> Self {
        self.natives.push((name.into(), value));
        self
    }

    /// Adds a function written in the language itself. Its snippet is
    /// registered under the pseudo-filename `<module>:<name>` so errors
    /// inside it stay attributable.
    pub fn lisp_func(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.lisp_funcs.push((name.into(), source.into()));
        self
    }

    /// Adds a snippet run for its side effects after the module's
    /// functions are in place. Registered as `<module>:script`.
    pub fn script(mut self, source: impl Into<String>) -> Self {
        self.scripts.push(source.into());
        self
    }

    pub fn natives(&self) -> &[(String, Value)] {
        &self.natives
    }

    pub fn lisp_funcs(&self) -> &[(String, String)] {
        &self.lisp_funcs
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }
}
