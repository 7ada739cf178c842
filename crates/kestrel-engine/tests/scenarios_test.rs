//! End-to-end scenarios for scope resolution and lowering.
//!
//! Each test runs source through the whole pipeline and checks the
//! completion value, under both loop layouts where loops are involved.

use kestrel_engine::{CompilerOptions, Engine, EngineOptions, Error, Value};

fn engines() -> Vec<Engine> {
    vec![
        Engine::new(),
        Engine::with_options(
            EngineOptions::default().compiler(CompilerOptions::default().loop_rotation(false)),
        ),
    ]
}

/// Evaluates `src` with loop rotation on and off and checks both agree.
fn eval_both(src: &str) -> String {
    let results: Vec<String> = engines()
        .iter_mut()
        .map(|engine| engine.eval(src).expect("Evaluation should succeed").to_string())
        .collect();
    assert_eq!(results[0], results[1], "loop layouts disagree for {}", src);
    results[0].clone()
}

#[test]
fn test_scenario_continue_in_for_loop() {
    let src = "var sum=0; for (var i=0;i<5;i++){ if(i===2) continue; sum+=i; } sum;";
    assert_eq!(eval_both(src), "8");
}

#[test]
fn test_scenario_duplicate_function_declarations() {
    let src = "function f(){ function g(){return 1;} function g(){return 2;} return g(); } f();";
    assert_eq!(Engine::new().eval(src).unwrap(), Value::Number(2.0));
}

#[test]
fn test_scenario_catch_variable_scope() {
    let mut engine = Engine::new();
    let src = r#"try { throw {name:"E"}; } catch(e){ var caught = e.name; } caught;"#;
    assert_eq!(engine.eval(src).unwrap(), Value::from("E"));

    // The catch variable is gone, the var declared in the catch body is not.
    assert_eq!(engine.eval("typeof e;").unwrap(), Value::from("undefined"));
    assert!(matches!(engine.eval("e;"), Err(Error::ReferenceError(_))));
    assert_eq!(engine.global("caught"), Some(Value::from("E")));
}

#[test]
fn test_redeclared_var_shares_binding() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("var a = 1; var a; a;").unwrap(), Value::Number(1.0));
    let src = "function f() { var b = 2; var b; return b; } f();";
    assert_eq!(engine.eval(src).unwrap(), Value::Number(2.0));
}

#[test]
fn test_catch_body_declarations_are_function_visible() {
    let src = "function f() { try { throw 3; } catch (e) { var v = e * 2; } return v; } f();";
    assert_eq!(Engine::new().eval(src).unwrap(), Value::Number(6.0));
}

#[test]
fn test_zero_iteration_loop_never_runs_body() {
    let src = "var calls = 0; function body() { calls++; } \
               for (var i = 0; i < 0; i++) body(); calls;";
    assert_eq!(eval_both(src), "0");
}

#[test]
fn test_iteration_counts() {
    let src = "var b = 0, inc = 0; for (var i = 0; i < 4; i++, inc++) { b++; } b + ',' + inc;";
    assert_eq!(eval_both(src), "4,4");

    let src = "var b = 0, inc = 0; for (var i = 0; i < 4; i++, inc++) { if (i % 2) continue; b++; } \
               b + ',' + inc;";
    assert_eq!(eval_both(src), "2,4");

    let src = "var inc = 0; for (var i = 0; i < 4; i++, inc++) { if (i == 2) break; } inc;";
    assert_eq!(eval_both(src), "2");
}

#[test]
fn test_while_and_do_while() {
    assert_eq!(eval_both("var n = 0; while (n < 3) n++; n;"), "3");
    assert_eq!(eval_both("var n = 10; do { n++; } while (n < 3); n;"), "11");
    assert_eq!(
        eval_both("var n = 0; do { n++; if (n == 2) continue; } while (n < 5); n;"),
        "5"
    );
}

#[test]
fn test_new_member_call_grouping() {
    let mut engine = Engine::new();
    engine
        .eval("function f() { return { m: function () { this.tag = 'constructed'; } }; }")
        .unwrap();

    // `new (f()).m()` constructs `f().m`; `(new f()).m()` calls it.
    assert_eq!(engine.eval("typeof new (f()).m();").unwrap(), Value::from("object"));
    assert_eq!(engine.eval("typeof (new f()).m();").unwrap(), Value::from("undefined"));
    assert_eq!(engine.eval("typeof new f().m();").unwrap(), Value::from("undefined"));
}

#[test]
fn test_typeof_undeclared() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("typeof undeclaredVar;").unwrap(), Value::from("undefined"));
    let src = "function f() { return typeof alsoMissing; } f();";
    assert_eq!(engine.eval(src).unwrap(), Value::from("undefined"));
}

#[test]
fn test_delete_returns_booleans() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("var o = {a: 1}; delete o.a;").unwrap(), Value::Boolean(true));
    assert_eq!(engine.eval("'a' in o;").unwrap(), Value::Boolean(false));
    assert_eq!(engine.eval("implicit = 1; delete implicit;").unwrap(), Value::Boolean(true));
    assert_eq!(engine.eval("typeof implicit;").unwrap(), Value::from("undefined"));
    assert_eq!(engine.eval("var kept; delete kept;").unwrap(), Value::Boolean(false));
    assert_eq!(engine.eval("delete nothingHere;").unwrap(), Value::Boolean(true));
    let src = "function f(p) { var l; return delete p + ',' + delete l; } f(1);";
    assert_eq!(engine.eval(src).unwrap(), Value::from("false,false"));
}

#[test]
fn test_scope_restored_when_catch_rethrows() {
    let src = "var x = 'outer'; \
               function t() { \
                 try { try { throw 1; } catch (x) { throw 2; } finally { } } catch (z) { } \
                 return x; \
               } t();";
    assert_eq!(Engine::new().eval(src).unwrap(), Value::from("outer"));

    let src = "var o = {v: 'obj'}; var v = 'global'; \
               try { with (o) { throw 1; } } catch (e) { } v;";
    assert_eq!(Engine::new().eval(src).unwrap(), Value::from("global"));
}

#[test]
fn test_undeclared_assignment_creates_global_by_default() {
    let mut engine = Engine::new();
    engine.eval("function f() { leaked = 5; } f();").unwrap();
    assert_eq!(engine.global("leaked"), Some(Value::Number(5.0)));
}

#[test]
fn test_undeclared_assignment_throws_when_strict() {
    let mut engine = Engine::with_options(EngineOptions::default().strict(true));
    let result = engine.eval("function f() { leaked = 5; } f();");
    assert!(matches!(result, Err(Error::ReferenceError(ref m)) if m == "leaked is not defined"));
    assert_eq!(engine.global("leaked"), None);

    // Declared names are still assignable.
    assert_eq!(engine.eval("var ok; ok = 1;").unwrap(), Value::Number(1.0));
}

#[test]
fn test_use_strict_prologue() {
    let mut engine = Engine::new();
    assert!(matches!(
        engine.eval("'use strict'; undeclared = 1;"),
        Err(Error::ReferenceError(_))
    ));
    assert!(matches!(
        engine.eval("function f() { 'use strict'; return function () { inner = 1; }; } f()();"),
        Err(Error::ReferenceError(_))
    ));
    assert!(matches!(
        engine.eval("'use strict'; eval('fromEval = 1');"),
        Err(Error::ReferenceError(_))
    ));
    // A strict error is catchable like any other ReferenceError.
    let src = "'use strict'; var r; try { missing = 1; } catch (e) { r = e.name; } r;";
    assert_eq!(engine.eval(src).unwrap(), Value::from("ReferenceError"));
}

#[test]
fn test_parenthesized_eval_is_direct() {
    let mut engine = Engine::new();
    let src = "function f() { (eval)('var x = 1'); return typeof x; } f();";
    assert_eq!(engine.eval(src).unwrap(), Value::from("number"));
    // The declaration stays in f's scope.
    assert_eq!(engine.eval("typeof x;").unwrap(), Value::from("undefined"));
}
