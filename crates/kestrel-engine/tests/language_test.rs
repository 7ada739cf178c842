//! Language integration tests
//!
//! Exercises statements and expressions through the public engine API.

use kestrel_engine::{Engine, EngineOptions, Error, Value};

fn eval(src: &str) -> String {
    let mut engine = Engine::new();
    engine.eval(src).expect("Evaluation should succeed").to_string()
}

#[test]
fn test_arithmetic() {
    let mut engine = Engine::new();

    assert_eq!(engine.eval("5 + 3;").unwrap().to_string(), "8");
    assert_eq!(engine.eval("10 - 4;").unwrap().to_string(), "6");
    assert_eq!(engine.eval("6 * 7;").unwrap().to_string(), "42");
    assert_eq!(engine.eval("15 / 3;").unwrap().to_string(), "5");
    assert_eq!(engine.eval("17 % 5;").unwrap().to_string(), "2");
    assert_eq!(engine.eval("2 + 3 * 4 - 1;").unwrap().to_string(), "13");
    assert_eq!(engine.eval("(2 + 3) * 4;").unwrap().to_string(), "20");
}

#[test]
fn test_comparison_and_equality() {
    let mut engine = Engine::new();

    assert_eq!(engine.eval("5 == 5;").unwrap().to_string(), "true");
    assert_eq!(engine.eval("5 != 3;").unwrap().to_string(), "true");
    assert_eq!(engine.eval("null == undefined;").unwrap().to_string(), "true");
    assert_eq!(engine.eval("null === undefined;").unwrap().to_string(), "false");
    assert_eq!(engine.eval("'5' == 5;").unwrap().to_string(), "true");
    assert_eq!(engine.eval("5 <= 5;").unwrap().to_string(), "true");
    assert_eq!(engine.eval("NaN == NaN;").unwrap().to_string(), "false");
}

#[test]
fn test_strings() {
    assert_eq!(eval("'Hello' + ' ' + 'World';"), "Hello World");
    assert_eq!(eval("var s = 'a'; s += 'b'; s += 1; s;"), "ab1");
    assert_eq!(eval("typeof 'x';"), "string");
}

#[test]
fn test_conditional_and_logical() {
    assert_eq!(eval("true ? 'yes' : 'no';"), "yes");
    assert_eq!(eval("0 ? 'yes' : 'no';"), "no");
    assert_eq!(eval("var a = null; a || 'fallback';"), "fallback");
    assert_eq!(eval("var a = 1; a && 'second';"), "second");
    assert_eq!(eval("!'';"), "true");
    assert_eq!(eval("1, 2, 3;"), "3");
    assert_eq!(eval("void 0;"), "undefined");
}

#[test]
fn test_update_expressions() {
    assert_eq!(eval("var i = 5; var j = i++; i + ',' + j;"), "6,5");
    assert_eq!(eval("var i = 5; var j = --i; i + ',' + j;"), "4,4");
    assert_eq!(eval("var o = {n: 1}; var old = o.n++; old + ',' + o.n;"), "1,2");
    assert_eq!(eval("var o = {n: 2}; o['n'] *= 10; o.n;"), "20");
    assert_eq!(eval("var k = 'x'; k++; k;"), "NaN");
}

#[test]
fn test_functions_and_closures() {
    let src = "function make(step) { var total = 0; \
               return function () { total += step; return total; }; } \
               var add2 = make(2); add2(); add2(); add2();";
    assert_eq!(eval(src), "6");

    assert_eq!(eval("function f(a, b) { return typeof b; } f(1);"), "undefined");
    assert_eq!(eval("function f() { } f();"), "undefined");
    assert_eq!(eval("function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); } fact(6);"), "720");
}

#[test]
fn test_hoisting() {
    assert_eq!(eval("var r = typeof later; var later = 1; r;"), "undefined");
    assert_eq!(eval("var r = hoisted(); function hoisted() { return 'ok'; } r;"), "ok");
    let src = "function f() { if (false) { var never = 1; } return typeof never; } f();";
    assert_eq!(eval(src), "undefined");
}

#[test]
fn test_named_function_expression_scope() {
    let src = "var f = function g() { return typeof g; }; f() + ',' + typeof g;";
    assert_eq!(eval(src), "function,undefined");
}

#[test]
fn test_this_binding() {
    assert_eq!(eval("var o = {v: 3, get: function () { return this.v; }}; o.get();"), "3");
    assert_eq!(eval("var o = {v: 3}; o['get'] = function () { return this.v; }; o['get']();"), "3");
    assert_eq!(eval("function t() { return typeof this; } t();"), "undefined");
    assert_eq!(eval("typeof this;"), "undefined");
}

#[test]
fn test_constructors_and_instanceof() {
    let src = "function Point(x, y) { this.x = x; this.y = y; } \
               var p = new Point(1, 2); p.x + p.y;";
    assert_eq!(eval(src), "3");

    let src = "function P() { } var p = new P(); var q = {}; \
               (p instanceof P) + ',' + (q instanceof P);";
    assert_eq!(eval(src), "true,false");

    // An object returned from a constructor replaces the fresh one.
    let src = "function C() { this.a = 1; return {b: 2}; } var c = new C(); typeof c.a + ',' + c.b;";
    assert_eq!(eval(src), "undefined,2");

    assert_eq!(eval("new Error('m') instanceof Error;"), "true");
    assert_eq!(eval("new TypeError('m') instanceof Error;"), "false");
}

#[test]
fn test_objects_and_arrays() {
    assert_eq!(eval("var o = {a: 1, 'b': 2, 3: 'c'}; o.a + o['b'] + o[3];"), "3c");
    assert_eq!(eval("var a = [1, , 3]; a.length + ',' + a[2] + ',' + (1 in a);"), "3,3,false");
    assert_eq!(eval("var a = []; a[4] = 1; a.length;"), "5");
    assert_eq!(eval("[1, 2, 3];"), "1,2,3");
    assert_eq!(eval("'a' in {a: undefined};"), "true");
}

#[test]
fn test_if_else_chain() {
    let src = "function grade(n) { if (n > 90) return 'A'; else if (n > 80) return 'B'; else return 'C'; } \
               grade(95) + grade(85) + grade(10);";
    assert_eq!(eval(src), "ABC");
}

#[test]
fn test_switch() {
    let src = "function s(n) { var r = ''; \
               switch (n) { case 1: r += 'a'; case 2: r += 'b'; break; default: r += 'd'; case 3: r += 'c'; } \
               return r; } \
               s(1) + s(2) + s(3) + s(9);";
    assert_eq!(eval(src), "abbcdc");

    assert_eq!(eval("var r = 0; switch ('1') { case 1: r = 1; } r;"), "0");
    assert_eq!(eval("var n = 0; switch (n++) { } n;"), "1");
}

#[test]
fn test_labeled_statements() {
    let src = "var c = 0; outer: for (var i = 0; i < 3; i++) { \
               for (var j = 0; j < 3; j++) { if (j == 1) continue outer; c++; } } c;";
    assert_eq!(eval(src), "3");

    let src = "var c = 0; outer: while (true) { while (true) { c++; break outer; } } c;";
    assert_eq!(eval(src), "1");

    let src = "var r = 'start'; block: { r = 'in'; break block; r = 'after'; } r;";
    assert_eq!(eval(src), "in");
}

#[test]
fn test_label_errors() {
    let mut engine = Engine::new();
    assert!(matches!(engine.eval("break;"), Err(Error::SyntaxError(_))));
    assert!(matches!(engine.eval("while (0) { continue nowhere; }"), Err(Error::SyntaxError(_))));
    assert!(matches!(engine.eval("a: { continue a; }"), Err(Error::SyntaxError(_))));
    assert!(matches!(
        engine.eval("function f() { while (1) { (function () { break; }); } }"),
        Err(Error::SyntaxError(_))
    ));
}

#[test]
fn test_for_in() {
    assert_eq!(eval("var o = {a: 1, b: 2, c: 3}; var ks = ''; for (var k in o) ks += k; ks;"), "abc");
    assert_eq!(eval("var n = 0; for (var k in null) n++; n;"), "0");

    // Keys are snapshotted before the first iteration.
    let src = "var o = {a: 1}; var ks = ''; for (var k in o) { o.z = 1; ks += k; } ks;";
    assert_eq!(eval(src), "a");

    let src = "var t = {}; for (t.key in {x: 1}); t.key;";
    assert_eq!(eval(src), "x");

    let src = "var seen = ''; for (var k in {a: 1, b: 2, c: 3}) { if (k == 'b') continue; \
               if (k == 'c') break; seen += k; } seen;";
    assert_eq!(eval(src), "a");
}

#[test]
fn test_try_catch_finally() {
    assert_eq!(eval("var r; try { throw 'boom'; } catch (e) { r = e; } r;"), "boom");
    assert_eq!(eval("function f() { try { return 1; } finally { return 2; } } f();"), "2");

    let src = "var log = ''; for (var i = 0; i < 3; i++) { \
               try { if (i == 1) break; log += i; } finally { log += 'f'; } } log;";
    assert_eq!(eval(src), "0ff");

    let src = "var log = ''; try { try { throw 'x'; } finally { log += 'f'; } } catch (e) { log += e; } log;";
    assert_eq!(eval(src), "fx");

    let src = "var log = ''; function f() { try { log += 't'; return 'r'; } finally { log += 'f'; } } \
               f() + log;";
    assert_eq!(eval(src), "rtf");

    let src = "var log = ''; for (var i = 0; i < 2; i++) { try { continue; } finally { log += i; } } log;";
    assert_eq!(eval(src), "01");
}

#[test]
fn test_runtime_errors_are_catchable() {
    let src = "var n = null; var r; try { n.x; } catch (e) { r = e instanceof TypeError; } r;";
    assert_eq!(eval(src), "true");

    let src = "var r; try { notAFunction(); } catch (e) { r = e.name; } r;";
    assert_eq!(eval(src), "ReferenceError");

    let src = "var r; try { var o = {}; o.nope(); } catch (e) { r = e.message; } r;";
    assert_eq!(eval(src), "o.nope is not a function");

    let src = "var r; try { throw new RangeError('deep'); } catch (e) { r = e.name + ':' + e.message; } r;";
    assert_eq!(eval(src), "RangeError:deep");
}

#[test]
fn test_uncaught_errors() {
    let mut engine = Engine::new();
    assert!(matches!(engine.eval("throw 42;"), Err(Error::Thrown(Value::Number(n))) if n == 42.0));
    assert!(matches!(engine.eval("var n = null; n.x;"), Err(Error::TypeError(_))));
    assert!(matches!(engine.eval("'k' in 5;"), Err(Error::TypeError(_))));
    assert!(matches!(engine.eval("with (undefined) {}"), Err(Error::TypeError(_))));
    let err = engine.eval("throw new TypeError('custom');").unwrap_err();
    assert_eq!(err.to_string(), "TypeError: custom");
}

#[test]
fn test_call_depth_limit_is_catchable() {
    let mut engine = Engine::with_options(EngineOptions::default().max_call_depth(16));
    let src = "function r(n) { return n == 0 ? 0 : r(n - 1); } \
               var out; try { r(100); } catch (e) { out = e.name; } out + ',' + r(5);";
    assert_eq!(engine.eval(src).unwrap(), Value::from("RangeError,0"));
}

#[test]
fn test_recursion_near_default_depth_limit() {
    let mut engine = Engine::new();
    let src = "function f(n) { return n == 0 ? 0 : 1 + f(n - 1); } f(250);";
    assert_eq!(engine.eval(src).unwrap(), Value::Number(250.0));

    // Past the limit the error is catchable and the engine stays usable.
    let src = "var out; try { f(300); } catch (e) { out = e.name; } out + ',' + f(10);";
    assert_eq!(engine.eval(src).unwrap(), Value::from("RangeError,10"));
}

#[test]
fn test_recursion_in_spawned_thread_with_small_stack() {
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            let src = "function f(n) { return n == 0 ? 0 : 1 + f(n - 1); } f(250);";
            Engine::new()
                .eval(src)
                .map(|v| v.to_string())
                .map_err(|e| e.to_string())
        })
        .unwrap();
    assert_eq!(handle.join().unwrap().unwrap(), "250");
}

#[test]
fn test_long_script_reuses_constants() {
    let src = format!("var x = 0; {} x;", "x = x + 1;".repeat(70_000));
    assert_eq!(Engine::new().eval(&src).unwrap(), Value::Number(70_000.0));
}

#[test]
fn test_too_many_constants_is_an_error() {
    // Each distinct literal needs its own pool entry.
    let mut src: String = (1..=70_000).map(|n| format!("x = {};", n)).collect();
    src.push_str(" x;");
    let mut engine = Engine::new();
    assert!(matches!(engine.eval(&src), Err(Error::RangeError(_))));
    assert_eq!(engine.global("x"), None);
}

#[test]
fn test_with_statement() {
    assert_eq!(eval("var o = {a: 1}; with (o) { a = 2; } o.a;"), "2");
    assert_eq!(eval("var o = {}; with (o) { b = 3; } typeof o.b + ',' + typeof b;"), "undefined,number");
    let src = "var a = 'global'; function f() { var o = {a: 'obj'}; with (o) { return a; } } f() + ',' + a;";
    assert_eq!(eval(src), "obj,global");
}

#[test]
fn test_eval() {
    assert_eq!(eval("function f() { eval('var z = 7'); return z; } f() + ',' + typeof z;"), "7,undefined");
    assert_eq!(eval("eval('var q = 1'); delete q;"), "true");
    assert_eq!(eval("eval('1 + 1;');"), "2");
    assert_eq!(eval("function f(a) { return eval('a * 3'); } f(4);"), "12");
    assert_eq!(eval("var o = {m: function () { return eval('this.v'); }, v: 9}; o.m();"), "9");

    let mut engine = Engine::new();
    assert!(matches!(engine.eval("eval('var = 1');"), Err(Error::SyntaxError(_))));
}

#[test]
fn test_unterminated_comment_is_syntax_error() {
    let mut engine = Engine::new();
    for src in ["/* x", "var a = 1; /* open", "a\n/* never closed *"] {
        assert!(
            matches!(engine.eval(src), Err(Error::SyntaxError(_))),
            "accepted {:?}",
            src
        );
    }
    let caught = "var r; try { eval('1 /* x'); } catch (e) { r = e.name; } r;";
    assert_eq!(engine.eval(caught).unwrap(), Value::from("SyntaxError"));
    assert_eq!(engine.eval("/* closed */ 1;").unwrap(), Value::Number(1.0));
}

#[test]
fn test_let_and_const_are_rejected() {
    let mut engine = Engine::new();
    assert!(matches!(engine.eval("let a = 1;"), Err(Error::SyntaxError(_))));
    assert!(matches!(engine.eval("const b = 1;"), Err(Error::SyntaxError(_))));
}

#[test]
fn test_bitwise() {
    assert_eq!(eval("5 & 3;"), "1");
    assert_eq!(eval("5 | 3;"), "7");
    assert_eq!(eval("5 ^ 3;"), "6");
    assert_eq!(eval("~0;"), "-1");
    assert_eq!(eval("-16 >> 2;"), "-4");
    assert_eq!(eval("-1 >>> 0;"), "4294967295");
}
