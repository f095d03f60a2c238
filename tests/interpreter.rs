use sorrel::{eval_str, Error, Value};

fn eval(source: &str) -> Value {
    match eval_str(source) {
        Ok(value) => value,
        Err(err) => panic!("evaluation failed: {err}"),
    }
}

fn eval_error(source: &str) -> Error {
    match eval_str(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

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

fn expect_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => panic!("expected bool, found {}", other.type_name()),
    }
}

fn expect_str(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => panic!("expected string, found {}", other.type_name()),
    }
}

fn expect_list(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.borrow().clone(),
        other => panic!("expected list, found {}", other.type_name()),
    }
}

fn expect_vector(value: &Value) -> Vec<f64> {
    match value {
        Value::Vector(items) => items.borrow().clone(),
        other => panic!("expected vector, found {}", other.type_name()),
    }
}

fn expect_ints(value: &Value) -> Vec<i64> {
    expect_list(value).iter().map(expect_int).collect()
}

#[test]
fn evaluates_arithmetic() {
    assert_eq!(expect_int(&eval("(+ 2 2)")), 4);
    assert_eq!(expect_int(&eval("(- 10 2 3)")), 5);
    assert_eq!(expect_int(&eval("(* 2 3 4)")), 24);
    assert_eq!(expect_int(&eval("(/ 7 2)")), 3);
    assert_eq!(expect_int(&eval("(% 7 2)")), 1);
    assert_eq!(expect_int(&eval("(- 5)")), -5);
}

#[test]
fn mixed_arithmetic_promotes_to_float() {
    assert_eq!(expect_float(&eval("(+ 1 2.5)")), 3.5);
    assert_eq!(expect_float(&eval("(* 2 2.0)")), 4.0);
    assert_eq!(expect_float(&eval("(/ 7 2.0)")), 3.5);
}

#[test]
fn parses_radix_literals() {
    assert_eq!(expect_int(&eval("0x10")), 16);
    assert_eq!(expect_int(&eval("-0x10")), -16);
    assert_eq!(expect_int(&eval("010")), 8);
    assert_eq!(expect_float(&eval("1e2")), 100.0);
    assert_eq!(expect_float(&eval("2.5")), 2.5);
}

#[test]
fn concatenates_and_compares_strings() {
    assert_eq!(expect_str(&eval(r#"(+ "foo" "bar")"#)), "foobar");
    assert!(expect_bool(&eval(r#"(< "apple" "banana")"#)));
    let message = eval_error(r#"(+ "a" 1)"#).to_string();
    assert!(message.contains("error in parameter type"), "{message}");
}

#[test]
fn division_by_zero_is_an_error() {
    let message = eval_error("(/ 1 0)").to_string();
    assert!(message.contains("division by zero"), "{message}");
    let message = eval_error("(% 1 0)").to_string();
    assert!(message.contains("division by zero"), "{message}");
}

#[test]
fn equality_is_strict_about_type() {
    assert!(!expect_bool(&eval("(== 42 42.0)")));
    assert!(expect_bool(&eval("(== 42 42)")));
    assert!(expect_bool(&eval("(!= 1 2)")));
    assert!(expect_bool(&eval("(== [1 2] [1 2])")));
}

#[test]
fn comparisons_promote_mixed_numbers() {
    assert!(expect_bool(&eval("(< 1 2.0)")));
    assert!(expect_bool(&eval("(>= 3 3)")));
    let message = eval_error(r#"(< 1 "two")"#).to_string();
    assert!(message.contains("error in parameter type"), "{message}");
}

#[test]
fn if_without_else_yields_false() {
    assert_eq!(expect_int(&eval("(if true 1 2)")), 1);
    assert_eq!(expect_int(&eval("(if false 1 2)")), 2);
    assert!(!expect_bool(&eval("(if false 1)")));
    // Only false itself is falsy.
    assert_eq!(expect_int(&eval("(if 0 1 2)")), 1);
    assert_eq!(expect_int(&eval("(if nil 1 2)")), 1);
}

#[test]
fn cond_picks_first_matching_branch() {
    assert_eq!(expect_int(&eval("(cond false 1 true 2)")), 2);
    assert_eq!(expect_int(&eval("(cond false 1 false 2 9)")), 9);
    assert!(!expect_bool(&eval("(cond false 1 false 2)")));
}

#[test]
fn and_or_short_circuit() {
    assert_eq!(expect_int(&eval("(and true 5)")), 5);
    assert!(!expect_bool(&eval(r#"(and false (error "not reached"))"#)));
    assert_eq!(expect_int(&eval("(or false 7)")), 7);
    assert_eq!(expect_int(&eval(r#"(or 3 (error "not reached"))"#)), 3);
    assert!(expect_bool(&eval("(and)")));
    assert!(!expect_bool(&eval("(or)")));
}

#[test]
fn var_defines_and_set_reassigns() {
    assert_eq!(expect_int(&eval("(var x 40) (+ x 2)")), 42);
    assert_eq!(expect_int(&eval("(var x 1) (set x 5) x")), 5);
    assert_eq!(expect_int(&eval("(var x) (set x 3) x")), 3);
}

#[test]
fn redefining_in_same_scope_is_rejected() {
    let message = eval_error("(var x 1) (var x 2)").to_string();
    assert!(
        message.contains("symbol already defined in current scope: x"),
        "{message}"
    );
}

#[test]
fn set_requires_an_existing_symbol() {
    let message = eval_error("(set y 1)").to_string();
    assert!(message.contains("cannot set undefined symbol: y"), "{message}");
}

#[test]
fn do_introduces_a_scope() {
    assert_eq!(expect_int(&eval("(do (var x 1) (var y 2) (+ x y))")), 3);
    let message = eval_error("(do (var x 1)) x").to_string();
    assert!(message.contains("undefined symbol: x"), "{message}");
    // Shadowing inside do leaves the outer binding alone.
    assert_eq!(expect_int(&eval("(var x 1) (do (var x 10) x) x")), 1);
    // set without a local definition writes through to the parent.
    assert_eq!(expect_int(&eval("(var x 1) (do (set x 7)) x")), 7);
}

#[test]
fn errors_carry_source_positions() {
    let err = eval_error("(no-such)");
    assert_eq!(err.to_string(), "sorrel source:1:2: undefined symbol: no-such");
    let err = eval_error("(+ 1 (boom))");
    assert_eq!(err.to_string(), "sorrel source:1:7: undefined symbol: boom");
    let err = eval_error("(var x 1)\nnope");
    assert_eq!(err.to_string(), "sorrel source:2:1: undefined symbol: nope");
}

#[test]
fn unterminated_forms_report_the_missing_closer() {
    assert!(eval_error("(+ 1").to_string().ends_with("missing )"));
    assert!(eval_error("[1 2").to_string().ends_with("missing ]"));
    assert!(eval_error(r#"{"a" 1"#).to_string().ends_with("missing }"));
    let message = eval_error(")").to_string();
    assert!(message.contains("unexpected )"), "{message}");
}

#[test]
fn named_functions_recurse() {
    let value = eval(
        r#"
        (func fib [n]
            (if (< n 2)
                n
                (+ (fib (- n 1)) (fib (- n 2)))))
        (fib 10)
        "#,
    );
    assert_eq!(expect_int(&value), 55);
}

#[test]
fn closures_capture_their_defining_scope() {
    let value = eval(
        r#"
        (var counter
            (func [] (do
                (var n 0)
                (func [] (set n (+ n 1)) n))))
        (var c (counter))
        (c) (c) (c)
        "#,
    );
    assert_eq!(expect_int(&value), 3);

    // Each factory call gets a fresh captive.
    let value = eval(
        r#"
        (var counter
            (func [] (do
                (var n 0)
                (func [] (set n (+ n 1)) n))))
        (var a (counter))
        (var b (counter))
        (a) (a) (b)
        "#,
    );
    assert_eq!(expect_int(&value), 1);
}

#[test]
fn closure_arity_mentions_the_name() {
    let message = eval_error("(func f [a b] a) (f 1)").to_string();
    assert!(message.contains("function \"f\" takes 2 arguments"), "{message}");
    let message = eval_error("(func f [a] a) (f 1 2)").to_string();
    assert!(message.contains("function \"f\" takes one argument"), "{message}");
    let message = eval_error("((func [] 1) 2)").to_string();
    assert!(
        message.contains("anonymous function takes no arguments"),
        "{message}"
    );
}

#[test]
fn fn_is_an_alias_for_func() {
    assert_eq!(expect_int(&eval("((fn [x] (* x x)) 6)")), 36);
}

#[test]
fn func_rejects_malformed_parameter_lists() {
    let message = eval_error("(func [1 2] 3)").to_string();
    assert!(
        message.contains("func takes a list of parameter symbols"),
        "{message}"
    );
    let message = eval_error("(func f)").to_string();
    assert!(message.contains("func takes two or more arguments"), "{message}");
}

#[test]
fn macro_rebinds_placeholders_in_captured_scope() {
    assert_eq!(expect_int(&eval("(var m (# (+ %1 %2))) (m 2 3)")), 5);
    // The template sees symbols defined after it.
    let value = eval(
        r#"
        (var m (# (* %1 scale)))
        (var scale 10)
        (m 4)
        "#,
    );
    assert_eq!(expect_int(&value), 40);
    let message = eval_error("(#)").to_string();
    assert!(message.contains("# takes one argument"), "{message}");
}

#[test]
fn vectors_broadcast_scalars() {
    assert_eq!(expect_vector(&eval("(+ 3 (vec 2 3 4))")), vec![5.0, 6.0, 7.0]);
    assert_eq!(expect_vector(&eval("(* (vec 1 2) (vec 3 4))")), vec![3.0, 8.0]);
    assert_eq!(expect_vector(&eval("(/ (vec 2 4) 2)")), vec![1.0, 2.0]);
    let message = eval_error("(+ (vec 1) (vec 1 2))").to_string();
    assert!(message.contains("vectors of different length"), "{message}");
}

#[test]
fn literal_lists_and_dicts_evaluate_elements() {
    assert_eq!(expect_ints(&eval("[1 (+ 1 1) 3]")), vec![1, 2, 3]);
    assert_eq!(expect_int(&eval(r#"(get {"a" (+ 40 2)} "a")"#)), 42);
    assert_eq!(expect_list(&eval("()")).len(), 0);
    let message = eval_error("{1 2 3}").to_string();
    assert!(
        message.contains("dict requires an even number of arguments"),
        "{message}"
    );
}

#[test]
fn keywords_are_string_sugar() {
    assert_eq!(expect_str(&eval(":north")), "north");
    assert_eq!(expect_int(&eval("(get {:a 1 :b 2} :b)")), 2);
}

#[test]
fn containers_in_call_position_look_up_keys() {
    assert_eq!(expect_int(&eval(r#"({"a" 1 "b" 2} "b")"#)), 2);
    assert_eq!(expect_int(&eval("([10 20 30] 1)")), 20);
    assert_eq!(expect_int(&eval("([10 20 30] -1)")), 30);
    assert_eq!(expect_float(&eval("((vec 1.5 2.5) 0)")), 1.5);
    // A string head indexes into a dictionary argument.
    assert_eq!(expect_int(&eval(r#"("a" {"a" 7})"#)), 7);
    let message = eval_error("(42 1)").to_string();
    assert!(message.contains("cannot use"), "{message}");
}

#[test]
fn lookup_failures_are_reported() {
    let message = eval_error(r#"(get {"a" 1} "b")"#).to_string();
    assert!(message.contains("key not found"), "{message}");
    let message = eval_error("(get [1 2] 5)").to_string();
    assert!(message.contains("out of range"), "{message}");
    let message = eval_error("(get [1 2] -3)").to_string();
    assert!(message.contains("out of range"), "{message}");
}

#[test]
fn update_mutates_shared_containers() {
    let value = eval(
        r#"
        (var a [1 2 3])
        (var b a)
        (update! a 1 42)
        (get b 1)
        "#,
    );
    assert_eq!(expect_int(&value), 42);
    assert_eq!(
        expect_int(&eval(r#"(var d {"k" 1}) (update! d "k" 2) (get d "k")"#)),
        2
    );
    assert_eq!(
        expect_float(&eval("(var v (vec 1 2)) (update! v 0 9.5) (get v 0)")),
        9.5
    );
}

#[test]
fn strings_index_by_character() {
    assert_eq!(expect_int(&eval(r#"(len "héllo")"#)), 5);
    assert_eq!(expect_str(&eval(r#"(get "héllo" 1)"#)), "é");
    assert_eq!(expect_str(&eval(r#"(sub "hello" 1 3)"#)), "el");
    assert!(expect_bool(&eval(r#"(contains? "hello" "ell")"#)));
}

#[test]
fn sub_accepts_negative_bounds() {
    assert_eq!(expect_ints(&eval("(sub [1 2 3 4] 1 3)")), vec![2, 3]);
    // A negative end is inclusive from the back.
    assert_eq!(expect_ints(&eval("(sub [1 2 3 4] 0 -1)")), vec![1, 2, 3, 4]);
    assert_eq!(expect_ints(&eval("(sub [1 2 3 4] -2 -1)")), vec![3, 4]);
    let message = eval_error("(sub [1 2 3] 2 5)").to_string();
    assert!(message.contains("out of range"), "{message}");
}

#[test]
fn range_builds_sequences() {
    assert_eq!(expect_ints(&eval("(range 0 5 1)")), vec![0, 1, 2, 3, 4]);
    assert_eq!(expect_ints(&eval("(range 5 0 -2)")), vec![5, 3, 1]);
    assert_eq!(expect_vector(&eval("(vec-range 0 3 1)")), vec![0.0, 1.0, 2.0]);
    let message = eval_error("(range 0 5 0)").to_string();
    assert!(message.contains("invalid argument"), "{message}");
}

#[test]
fn container_helpers_work() {
    assert_eq!(expect_ints(&eval("(append [1] 2 3)")), vec![1, 2, 3]);
    assert_eq!(expect_ints(&eval("(concat [1] [2 3])")), vec![1, 2, 3]);
    assert_eq!(expect_ints(&eval("(reverse [1 2 3])")), vec![3, 2, 1]);
    assert_eq!(expect_ints(&eval("(skip 1 [1 2 3])")), vec![2, 3]);
    assert_eq!(expect_ints(&eval("(take 2 [1 2 3])")), vec![1, 2]);
    assert_eq!(expect_ints(&eval("(flatten [1 [2 [3]]] 4)")), vec![1, 2, 3, 4]);
    assert_eq!(expect_int(&eval(r#"(len {"a" 1 "b" 2})"#)), 2);
    // contains? on sequences asks whether the index resolves.
    assert!(expect_bool(&eval("(contains? [1 2] 1)")));
    assert!(!expect_bool(&eval("(contains? [1 2] 5)")));
    assert!(expect_bool(&eval("(contains? [1 2] -1)")));
    assert!(!expect_bool(&eval("(contains? [1 2] -3)")));
    assert!(expect_bool(&eval(r#"(contains? {"a" 1} "a")"#)));
}

#[test]
fn merge_prefers_later_entries() {
    assert_eq!(expect_int(&eval(r#"(get (merge {"a" 1} {"a" 2 "b" 3}) "a")"#)), 2);
    assert_eq!(expect_int(&eval(r#"(len (merge {"a" 1} {"a" 2 "b" 3}))"#)), 2);
}

#[test]
fn repeat_builds_uniform_sequences() {
    let items = expect_list(&eval(r#"(repeat 3 "x")"#));
    assert_eq!(items.len(), 3);
    assert_eq!(expect_str(&items[0]), "x");
    assert_eq!(expect_vector(&eval("(vec-repeat 2 1.5)")), vec![1.5, 1.5]);
    let message = eval_error(r#"(repeat -1 "x")"#).to_string();
    assert!(message.contains("error in parameter type"), "{message}");
}

#[test]
fn type_predicates_classify_containers() {
    assert!(expect_bool(&eval("(list? [1])")));
    assert!(!expect_bool(&eval("(list? (vec 1))")));
    assert!(expect_bool(&eval("(vec? (vec 1))")));
    assert!(expect_bool(&eval(r#"(dict? {"a" 1})"#)));
    assert!(expect_bool(&eval("(nil? nil)")));
    assert!(!expect_bool(&eval("(nil? 0)")));
}

#[test]
fn vec2list_and_dict_keys_convert() {
    let items = expect_list(&eval("(vec2list (vec 1 2))"));
    assert_eq!(items.len(), 2);
    assert_eq!(expect_float(&items[0]), 1.0);

    let keys = expect_list(&eval(r#"(dict-keys {"a" 1 "b" 2})"#));
    let keys: Vec<String> = keys.iter().map(expect_str).collect();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    let message = eval_error("(dict-keys [1 2])").to_string();
    assert!(message.contains("dict-keys expects a dictionary"), "{message}");
}

#[test]
fn map_walks_sequences_in_lockstep() {
    assert_eq!(expect_ints(&eval("(map inc [1 2 3])")), vec![2, 3, 4]);
    assert_eq!(expect_ints(&eval("(map + [1 2] [10 20])")), vec![11, 22]);
    assert_eq!(
        expect_ints(&eval("(map-indexed (func [i v] (+ i v)) [10 20])")),
        vec![10, 21]
    );
    let message = eval_error("(map + [1 2] [1])").to_string();
    assert!(message.contains("lists must be of same length"), "{message}");
}

#[test]
fn vec_map_requires_float_results() {
    assert_eq!(
        expect_vector(&eval("(vec-map (func [x] (* x 2.0)) (vec 1 2))")),
        vec![2.0, 4.0]
    );
    let message = eval_error(r#"(vec-map (func [x] "no") (vec 1))"#).to_string();
    assert!(message.contains("expected function to return float"), "{message}");
}

#[test]
fn filter_keeps_matching_elements() {
    assert_eq!(expect_ints(&eval("(filter (func [x] (> x 1)) [1 2 3])")), vec![2, 3]);
    assert_eq!(
        expect_vector(&eval("(filter (func [x] (> x 1.5)) (vec 1 2 3))")),
        vec![2.0, 3.0]
    );
    assert_eq!(expect_int(&eval("(count-if (func [x] (> x 1)) [1 2 3])")), 2);
    let message = eval_error("(filter (func [x] x) [1])").to_string();
    assert!(message.contains("callback must return bool"), "{message}");
}

#[test]
fn reduce_seeds_from_first_element_or_init() {
    assert_eq!(expect_int(&eval("(reduce + [1 2 3])")), 6);
    assert_eq!(expect_int(&eval("(reduce + [1 2 3] 10)")), 16);
    assert!(matches!(eval("(reduce + [])"), Value::Nil));
    let message = eval_error("(reduce +)").to_string();
    assert!(message.contains("reduce takes two or three arguments"), "{message}");
}

#[test]
fn sorting_uses_the_comparator() {
    assert_eq!(expect_ints(&eval("(sort-asc < [3 1 2])")), vec![1, 2, 3]);
    assert_eq!(expect_ints(&eval("(sort-desc < [3 1 2])")), vec![3, 2, 1]);
    assert_eq!(expect_ints(&eval("(sortindex < [30 10 20])")), vec![1, 2, 0]);
    let message = eval_error("(sort-asc (func [a b] 1) [2 1])").to_string();
    assert!(message.contains("callback must return bool"), "{message}");
}

#[test]
fn apply_spreads_a_sequence() {
    assert_eq!(expect_int(&eval("(apply + [1 2 3])")), 6);
    assert_eq!(expect_float(&eval("(vec-apply + (vec 1 2 3))")), 6.0);
}

#[test]
fn bind_fixes_leading_arguments() {
    assert_eq!(expect_int(&eval("((bind + 10) 1 2)")), 13);
    let message = eval_error("(bind 1 2)").to_string();
    assert!(message.contains("first argument must be callable"), "{message}");
    let message = eval_error("(bind +)").to_string();
    assert!(message.contains("bind takes 2 or more arguments"), "{message}");
}

#[test]
fn thread_pipes_through_functions() {
    assert_eq!(expect_int(&eval("(-> 2 inc inc)")), 4);
    assert_eq!(expect_int(&eval("(-> 5)")), 5);
    let message = eval_error("(->)").to_string();
    assert!(message.contains("-> takes 1 or more arguments"), "{message}");
}

#[test]
fn repeatedly_calls_a_thunk() {
    assert_eq!(expect_ints(&eval("(repeatedly 3 (func [] 7))")), vec![7, 7, 7]);
    let message = eval_error("(repeatedly 3 5)").to_string();
    assert!(
        message.contains("repeatedly takes a function as second parameter"),
        "{message}"
    );
}

#[test]
fn while_reevaluates_its_condition() {
    let value = eval(
        r#"
        (var i 0)
        (var total 0)
        (while (< i 5)
            (set total (+ total i))
            (set i (+ i 1)))
        total
        "#,
    );
    assert_eq!(expect_int(&value), 10);

    // A callable condition is invoked each round.
    let value = eval(
        r#"
        (var i 0)
        (while (func [] (< i 3)) (set i (+ i 1)))
        i
        "#,
    );
    assert_eq!(expect_int(&value), 3);
}

#[test]
fn for_runs_init_test_step() {
    let value = eval(
        r#"
        (var total 0)
        (for (var i 0) (< i 4) (set i (+ i 1))
            (set total (+ total i)))
        total
        "#,
    );
    assert_eq!(expect_int(&value), 6);
    let message = eval_error("(for (var i 0) (< i 4) (set i (+ i 1)))").to_string();
    assert!(message.contains("for takes four or more arguments"), "{message}");
}

#[test]
fn min_max_follow_argument_types() {
    assert_eq!(expect_int(&eval("(min 3 1 2)")), 1);
    assert_eq!(expect_int(&eval("(max 3 1 2)")), 3);
    assert_eq!(expect_float(&eval("(max 1 2.5)")), 2.5);
    assert!(expect_float(&eval("(min nan 1.0)")).is_nan());
}

#[test]
fn int_and_float_convert() {
    assert_eq!(expect_int(&eval("(int 3.7)")), 3);
    assert_eq!(expect_int(&eval("(int -3.7)")), -3);
    assert_eq!(expect_float(&eval("(float 3)")), 3.0);
    assert!(!expect_bool(&eval("(not true)")));
    let message = eval_error("(! 1)").to_string();
    assert!(message.contains("error in parameter type"), "{message}");
}

#[test]
fn bootstrap_entries_are_available() {
    assert_eq!(expect_int(&eval("(identity 9)")), 9);
    assert_eq!(expect_int(&eval("(first [4 5 6])")), 4);
    assert_eq!(expect_int(&eval("(second [4 5 6])")), 5);
    assert_eq!(expect_ints(&eval("(rest [4 5 6])")), vec![5, 6]);
    assert_eq!(expect_int(&eval("(last [4 5 6])")), 6);
    assert!(expect_bool(&eval("(empty? [])")));
    assert!(!expect_bool(&eval("(empty? [1])")));
    assert_eq!(expect_int(&eval("(inc 4)")), 5);
    assert_eq!(expect_int(&eval("(dec 4)")), 3);
    assert_eq!(expect_int(&eval("(def z 9) z")), 9);
}

#[test]
fn eval_runs_source_in_a_fresh_environment() {
    assert_eq!(expect_int(&eval(r#"(eval "(+ 1 2)")"#)), 3);
    // Outer bindings are invisible to the nested program.
    let message = eval_error(r#"(var x 5) (eval "x")"#).to_string();
    assert!(message.contains("undefined symbol: x"), "{message}");
    let message = eval_error(r#"(eval "(")"#).to_string();
    assert!(message.contains("error in eval"), "{message}");
}

#[test]
fn load_runs_source_in_the_current_scope() {
    assert_eq!(expect_int(&eval(r#"(var src "(var y 7)") (load src) y"#)), 7);
    let message = eval_error("(load 42)").to_string();
    assert!(
        message.contains("load function takes a single string argument"),
        "{message}"
    );
}

#[test]
fn code_returns_the_source_slice() {
    assert_eq!(expect_str(&eval("(code (+ 1 2))")), "(+ 1 2)");
    assert_eq!(expect_str(&eval("(code x)")), "x");
    let message = eval_error("(code)").to_string();
    assert!(message.contains("code takes one argument"), "{message}");
}

#[test]
fn time_returns_the_timed_result() {
    assert_eq!(expect_int(&eval("(time (+ 1 2))")), 3);
}

#[test]
fn user_errors_carry_their_message() {
    let message = eval_error(r#"(error "boom")"#).to_string();
    assert!(message.contains("boom"), "{message}");
    let message = eval_error("(error 42)").to_string();
    assert!(
        message.contains("error function takes a single string argument"),
        "{message}"
    );
}

#[test]
fn sprintf_formats_values() {
    assert_eq!(expect_str(&eval(r#"(sprintf "Value: %.02f" 1.0)"#)), "Value: 1.00");
    assert_eq!(expect_str(&eval(r#"(sprintf "%v %v" 1 "x")"#)), "1 x");
    assert_eq!(expect_str(&eval(r#"(sprintf "%6d|" 42)"#)), "    42|");
    assert_eq!(expect_str(&eval(r#"(sprintf "%-6d|" 42)"#)), "42    |");
    assert_eq!(expect_str(&eval(r#"(sprintf "%08.3f" 3.14159)"#)), "0003.142");
    assert_eq!(expect_str(&eval(r#"(sprintf "%x" 255)"#)), "ff");
    assert_eq!(expect_str(&eval(r#"(sprintf "100%%")"#)), "100%");
    assert_eq!(expect_str(&eval(r#"(sprintf "%v" [1 2])"#)), "[1 2]");
}

#[test]
fn sprintf_rejects_mismatched_arguments() {
    let message = eval_error(r#"(sprintf "%d" 1.5)"#).to_string();
    assert!(message.contains("error in parameter type"), "{message}");
    let message = eval_error(r#"(sprintf "%d %d" 1)"#).to_string();
    assert!(message.contains("wrong number of parameters"), "{message}");
    let message = eval_error(r#"(sprintf "%d" 1 2)"#).to_string();
    assert!(message.contains("wrong number of parameters"), "{message}");
    let message = eval_error(r#"(sprintf "%q" 1)"#).to_string();
    assert!(message.contains("unsupported format verb"), "{message}");
}

#[test]
fn string_helpers_transform_case() {
    assert_eq!(expect_str(&eval(r#"(str.upper "abc")"#)), "ABC");
    assert_eq!(expect_str(&eval(r#"(str.lower "AbC")"#)), "abc");
    assert_eq!(expect_str(&eval(r#"(str.title "hello world")"#)), "Hello World");
    assert_eq!(expect_str(&eval(r#"(str.trim "  x  ")"#)), "x");
    assert_eq!(expect_str(&eval("(str 42)")), "42");
}

#[test]
fn math_helpers_compute() {
    assert_eq!(expect_float(&eval("(math.pow 3 2)")), 9.0);
    assert_eq!(expect_float(&eval("(math.sqrt 9)")), 3.0);
    assert_eq!(expect_float(&eval("(math.ceil 1.2)")), 2.0);
    assert!(expect_bool(&eval("(nan? nan)")));
    assert!(!expect_bool(&eval("(nan? 1.0)")));
    assert!(expect_bool(&eval("(pos-inf? (/ 1.0 0.0))")));
    assert_eq!(expect_float(&eval("((pow 2) 3)")), 9.0);
}

#[test]
fn prelude_scripts_define_helpers() {
    assert_eq!(expect_int(&eval("((cap 0 10) 15)")), 10);
    assert_eq!(expect_int(&eval("((cap 0 10) -5)")), 0);
    assert_eq!(expect_int(&eval("((cap 0 10) 5)")), 5);
    assert_eq!(expect_int(&eval("((with-default 3) nan)")), 3);
    assert_eq!(expect_float(&eval("((with-default 3) 1.5)")), 1.5);
    assert_eq!(expect_int(&eval("((positive 0) -2.5)")), 0);
    assert!(expect_bool(&eval("((in-range? 1 5) 3)")));
    assert!(!expect_bool(&eval("((in-range? 1 5) 7)")));
}

#[test]
fn combinations_pair_every_element() {
    let combos = expect_list(&eval("(combinations [1 2] [3])"));
    assert_eq!(combos.len(), 2);
    assert_eq!(expect_ints(&combos[0]), vec![1, 3]);
    assert_eq!(expect_ints(&combos[1]), vec![2, 3]);
}

#[test]
fn transpose_swaps_rows_and_columns() {
    let rows = expect_list(&eval("(transpose [[1 2] [3 4]])"));
    assert_eq!(expect_ints(&rows[0]), vec![1, 3]);
    assert_eq!(expect_ints(&rows[1]), vec![2, 4]);
    let message = eval_error("(transpose [[1 2] [3]])").to_string();
    assert!(message.contains("all lists must be the same length"), "{message}");
    let message = eval_error("(transpose [1 2])").to_string();
    assert!(message.contains("expected list of lists"), "{message}");
}

#[test]
fn series_windows_compute() {
    assert_eq!(expect_vector(&eval("((series/sma 2) (vec 1 3 5))")), vec![2.0, 4.0]);
    assert_eq!(expect_vector(&eval("((series/sma 5) (vec 1 2))")), Vec::<f64>::new());
    assert_eq!(
        expect_vector(&eval("((series/momentum 1) (vec 1 2 4))")),
        vec![1.0, 1.0]
    );
    assert_eq!(
        expect_vector(&eval("((series/max-n 2) (vec 3 1 2 5))")),
        vec![3.0, 3.0, 3.0, 5.0]
    );
    assert_eq!(
        expect_vector(&eval("((series/rel-change-n 1) (vec 1 2 4))")),
        vec![1.0, 1.0]
    );
    assert_eq!(
        expect_vector(&eval("((series/abs-change-n 2) (vec 1 2 4))")),
        vec![3.0]
    );
    let message = eval_error("((series/sma 0) (vec 1 2))").to_string();
    assert!(message.contains("invalid argument"), "{message}");
    let message = eval_error("((series/sma 2) [1 2])").to_string();
    assert!(message.contains("error in parameter type"), "{message}");
}

#[test]
fn series_vector_transforms_compute() {
    assert_eq!(
        expect_vector(&eval("(series/rel-change (vec 1 2 4))")),
        vec![0.0, 1.0, 1.0]
    );
    assert_eq!(
        expect_vector(&eval("(series/abs-change (vec 1 3 6))")),
        vec![0.0, 2.0, 3.0]
    );
    assert_eq!(
        expect_vector(&eval("(series/accum-dev (vec 0 1 1))")),
        vec![0.0, 1.0, 3.0]
    );
    assert_eq!(
        expect_vector(&eval("(series/nrank (vec 30 10 20))")),
        vec![1.0, 0.0, 0.5]
    );
    assert_eq!(expect_vector(&eval("(series/nrank (vec 7))")), vec![1.0]);
}

#[test]
fn series_aggregates_compute() {
    assert_eq!(expect_float(&eval("(series/mean (vec 1 2 3))")), 2.0);
    assert_eq!(expect_float(&eval("(series/sum (vec 1 2 3))")), 6.0);
    assert_eq!(expect_float(&eval("(series/stdev (vec 2 2))")), 0.0);
    assert!(expect_float(&eval("(series/mean (vec))")).is_nan());
}

#[test]
fn program_returns_its_last_value() {
    assert_eq!(expect_int(&eval("1 2 3")), 3);
    assert!(matches!(eval(""), Value::Nil));
    assert!(matches!(eval("; just a comment"), Value::Nil));
}
