use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use sorrel::{
    adapters::Adapter, environment::OutRef, eval_str_env, extend, Env, ExprExtender, Extender,
    FnExtender, Module, Program, Store, Value,
};

fn expect_int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        other => panic!("expected int, found {}", other.type_name()),
    }
}

fn expect_float(value: &Value) -> f64 {
    match value {
        Value::Float(n) => *n,
        other => panic!("expected float, found {}", other.type_name()),
    }
}

fn stored_float(store: &IndexMap<String, Value>, id: &str) -> f64 {
    let value = store.get(id).unwrap_or_else(|| panic!("{id} not stored"));
    expect_float(value)
}

#[test]
fn missing_reports_free_symbols_in_order() {
    let program = Program::new("(+ x (f y))").expect("parse");
    let missing = program.missing(&Env::new()).expect("missing");
    assert_eq!(missing, vec!["x".to_string(), "f".to_string(), "y".to_string()]);
}

#[test]
fn missing_tracks_var_definitions() {
    let program = Program::new("(var x 1) (+ x y)").expect("parse");
    let missing = program.missing(&Env::new()).expect("missing");
    assert_eq!(missing, vec!["y".to_string()]);

    let program = Program::new("(var x 1) (* x x)").expect("parse");
    assert!(program.missing(&Env::new()).expect("missing").is_empty());
}

#[test]
fn env_vars_resolve_free_symbols() {
    let mut env = Env::new();
    env.add_var("x", 1.25);
    let program = Program::new("(+ x 2.5)").expect("parse");
    assert!(program.missing(&env).expect("missing").is_empty());
    assert_eq!(expect_float(&program.eval(&env).expect("eval")), 3.75);
}

#[test]
fn env_vars_override_module_bindings() {
    let mut env = Env::new();
    env.add_var("inc", 5i64);
    assert_eq!(expect_int(&eval_str_env("inc", &env).expect("eval")), 5);
}

#[test]
fn bare_environment_has_no_builtins() {
    let err = eval_str_env("(+ 1 2)", &Env::bare()).expect_err("+ should be unbound");
    let message = err.to_string();
    assert!(message.contains("undefined symbol: +"), "{message}");
}

#[test]
fn custom_modules_bootstrap_in_order() {
    let module = Module::new("custom")
        .native("base", Value::Int(40))
        .lisp_func("plus-two", "(func [n] (+ n 2))")
        .script("(var answer (plus-two base))");
    let mut env = Env::new();
    env.add_module(module);
    assert_eq!(expect_int(&eval_str_env("answer", &env).expect("eval")), 42);
}

#[test]
fn later_modules_win_name_clashes() {
    let mut env = Env::new();
    env.add_module(Module::new("one").native("k", Value::Int(1)));
    env.add_module(Module::new("two").native("k", Value::Int(2)));
    assert_eq!(expect_int(&eval_str_env("k", &env).expect("eval")), 2);
}

#[test]
fn host_natives_guard_arguments_with_adapters() {
    let pairs = Value::native_with(vec![Adapter::EvenArity], |args: &[Value]| {
        Ok(Value::Int(args.len() as i64 / 2))
    });
    let mut env = Env::new();
    env.add_module(Module::new("host").native("pairs", pairs));
    assert_eq!(expect_int(&eval_str_env("(pairs 1 2 3 4)", &env).expect("eval")), 2);
    let message = eval_str_env("(pairs 1 2 3)", &env)
        .expect_err("odd count should fail")
        .to_string();
    assert!(message.contains("wrong number of parameters"), "{message}");
}

#[test]
fn module_script_failures_poison_the_scope() {
    let mut env = Env::new();
    env.add_module(Module::new("broken").script("(boom)"));
    let err = eval_str_env("1", &env).expect_err("bootstrap should fail");
    let message = err.to_string();
    assert!(message.contains("undefined symbol: boom"), "{message}");
    assert!(message.contains("broken:script"), "{message}");
}

#[test]
fn programs_reevaluate_cleanly() {
    let program = Program::new("(+ 20 22)").expect("parse");
    assert_eq!(program.code(), "(+ 20 22)");
    let env = Env::new();
    assert_eq!(expect_int(&program.eval(&env).expect("first eval")), 42);
    assert_eq!(expect_int(&program.eval(&env).expect("second eval")), 42);
}

#[test]
fn named_programs_attribute_errors() {
    let program = Program::with_name("(boom)", "test.srl").expect("parse");
    let env = Env::new();
    let err = program.eval(&env).expect_err("boom is unbound");
    assert_eq!(err.to_string(), "test.srl:1:2: undefined symbol: boom");
    // Positions stay stable across repeated evaluations.
    let again = program.eval(&env).expect_err("still unbound");
    assert_eq!(again.to_string(), err.to_string());
}

#[test]
fn printf_output_redirects() {
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let mut program = Program::new(r#"(printf "%d-%d\n" 1 2) (printf "done\n")"#).expect("parse");
    let out: OutRef = buffer.clone();
    program.redirect_output(out);
    program.eval(&Env::new()).expect("eval");
    let written = String::from_utf8(buffer.borrow().clone()).expect("utf8");
    assert_eq!(written, "1-2\ndone\n");
}

#[test]
fn expr_extenders_fill_a_store_out_of_order() {
    let env = Env::new();
    let mut store: IndexMap<String, Value> = IndexMap::new();
    store.set("a", Value::Float(1.0));
    let b = ExprExtender::new("b", "(+ a 1.0)", &env).expect("parse b");
    let c = ExprExtender::new("c", "(+ a b)", &env).expect("parse c");
    // c is listed first but only runs once b has landed.
    extend(&mut store, &[&c, &b]).expect("extend");
    assert_eq!(stored_float(&store, "b"), 2.0);
    assert_eq!(stored_float(&store, "c"), 3.0);
}

#[test]
fn extend_reports_unproducible_dependencies() {
    let env = Env::new();
    let mut store: IndexMap<String, Value> = IndexMap::new();
    let c = ExprExtender::new("c", "(+ q 1)", &env).expect("parse");
    let err = extend(&mut store, &[&c]).expect_err("q has no producer");
    let message = err.to_string();
    assert!(message.contains("missing extender for q"), "{message}");
}

#[test]
fn extend_detects_dependency_cycles() {
    let env = Env::new();
    let mut store: IndexMap<String, Value> = IndexMap::new();
    let x = ExprExtender::new("x", "(+ y 1)", &env).expect("parse x");
    let y = ExprExtender::new("y", "(+ x 1)", &env).expect("parse y");
    let err = extend(&mut store, &[&x, &y]).expect_err("cycle");
    let message = err.to_string();
    assert!(message.contains("unresolvable dependencies"), "{message}");
    assert!(message.contains('x') && message.contains('y'), "{message}");
}

#[test]
fn extenders_skip_ids_already_stored() {
    let env = Env::new();
    let mut store: IndexMap<String, Value> = IndexMap::new();
    store.set("c", Value::Float(9.0));
    // Its dependency is unsatisfiable, but it never needs to run.
    let c = ExprExtender::new("c", "(+ q 1)", &env).expect("parse");
    extend(&mut store, &[&c]).expect("extend");
    assert_eq!(stored_float(&store, "c"), 9.0);
}

#[test]
fn fn_extenders_receive_fetched_values() {
    let mut store: IndexMap<String, Value> = IndexMap::new();
    store.set("a", Value::Float(1.0));
    store.set("b", Value::Float(2.0));
    let sum = FnExtender::new("sum", vec!["a".to_string(), "b".to_string()], |values| {
        let total: f64 = values.iter().filter_map(|v| v.as_float()).sum();
        Ok(Value::Float(total))
    });
    assert_eq!(sum.describe(), "fn(a b)");
    extend(&mut store, &[&sum]).expect("extend");
    assert_eq!(stored_float(&store, "sum"), 3.0);
}

#[test]
fn elementwise_extenders_map_vectors() {
    let env = Env::new();
    let mut store: IndexMap<String, Value> = IndexMap::new();
    store.set("a", Value::vector(vec![1.0, 2.0, 3.0]));
    let doubled = ExprExtender::elementwise("doubled", "(* a 2)", &env).expect("parse");
    extend(&mut store, &[&doubled]).expect("extend");
    let value = store.get("doubled").expect("doubled stored");
    match value {
        Value::Vector(values) => assert_eq!(*values.borrow(), vec![2.0, 4.0, 6.0]),
        other => panic!("expected vector, found {}", other.type_name()),
    }
}

#[test]
fn elementwise_extenders_require_equal_lengths() {
    let env = Env::new();
    let mut store: IndexMap<String, Value> = IndexMap::new();
    store.set("a", Value::vector(vec![1.0, 2.0]));
    store.set("b", Value::vector(vec![1.0, 2.0, 3.0]));
    let sum = ExprExtender::elementwise("sum", "(+ a b)", &env).expect("parse");
    let err = extend(&mut store, &[&sum]).expect_err("length mismatch");
    let message = err.to_string();
    assert!(message.contains("vectors of different length"), "{message}");
}
