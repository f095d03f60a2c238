//! Core library for the sorrel expression language: an embeddable,
//! dynamically typed lisp dialect with host-extensible modules, a
//! missing-symbols pass for dependency discovery, and REPL utilities.

pub mod adapters;
pub mod ast;
pub mod diagnostics;
pub mod environment;
pub mod extend;
pub mod lexer;
pub mod modules;
pub mod parser;
pub mod prelude;
pub mod repl;
pub mod runtime;
pub mod series;
pub mod stdlib;
pub mod value;

pub use diagnostics::{Error, Position, Result, SorrelError, SourceSpan};
pub use extend::{extend, ExprExtender, Extender, FnExtender, Store};
pub use modules::Module;
pub use repl::Repl;
pub use runtime::{eval_str, eval_str_env, Env, Program};
pub use value::Value;
