use super::{error, output};
use crate::runtime::{error::RuntimeError, interpreter::MAX_CALL_DEPTH};
use pretty_assertions::assert_eq;

#[test]
fn closures_share_their_defining_scope() {
    let source = r#"
fn counter() -> fn() -> number {
    let n = 0
    return fn() -> number { n++; return n }
}
let c = counter()
c()
c()
println(c())
let other = counter()
println(other())
"#;
    assert_eq!(output(source), "3\n1\n");
}

#[test]
fn default_parameters_fill_missing_arguments() {
    let source = r#"
fn greet(name: string, greeting: string = "hi") -> string {
    return greeting + " " + name
}
println(greet("bo"), greet("al", "yo"))
"#;
    assert_eq!(output(source), "hi bo yo al\n");
}

#[test]
fn defaults_are_evaluated_at_every_call() {
    let source = r#"
let calls = 0
fn next() -> number { calls++; return calls }
fn take(n: number = next()) -> number { return n }
take()
take(100)
println(take(), calls)
"#;
    assert_eq!(output(source), "2 2\n");
}

#[test]
fn arity_is_checked() {
    let source = r#"
fn pair(a: number, b: number = 0) -> number { return a + b }
pair()
"#;
    assert!(matches!(
        error(source),
        RuntimeError::ArityMismatch { received: 0, .. }
    ));
    let source = "fn one(a: number) {}; one(1, 2)";
    assert!(matches!(
        error(source),
        RuntimeError::ArityMismatch {
            expected: 1,
            received: 2,
            ..
        }
    ));
}

#[test]
fn parameter_and_return_types_are_enforced() {
    assert!(matches!(
        error(r#"fn f(x: number) {}; f("s")"#),
        RuntimeError::TypeMismatch { .. }
    ));
    assert!(matches!(
        error(r#"fn g() -> number { return "s" }; g()"#),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn arguments_are_copied_into_the_callee() {
    let source = r#"
fn grow(items: []number) { items.append(9) }
let s = []number{1}
grow(s)
println(s.len())
"#;
    assert_eq!(output(source), "1\n");
}

#[test]
fn declarations_are_hoisted_for_mutual_recursion() {
    let source = r#"
println(is_even(10))
fn is_even(n: number) -> bool { if n == 0 { return true }; return is_odd(n - 1) }
fn is_odd(n: number) -> bool { if n == 0 { return false }; return is_even(n - 1) }
"#;
    assert_eq!(output(source), "true\n");
}

#[test]
fn function_bindings_accept_same_signature_only() {
    let source = r#"
fn pick() -> number { return 1 }
pick = fn() -> number { return 2 }
println(pick())
"#;
    assert_eq!(output(source), "2\n");
    let source = r#"
fn pick() -> number { return 1 }
pick = fn() -> string { return "x" }
"#;
    assert!(matches!(error(source), RuntimeError::TypeMismatch { .. }));
}

#[test]
fn type_aliases_name_signatures() {
    let source = r#"
type Celsius = number
type Check = fn(Celsius) -> bool
fn warm(c: Celsius) -> bool { return c > 20 }
let check: Check = warm
println(check(25), typeof check)
"#;
    assert_eq!(output(source), "true fn(c: number) -> bool\n");
}

#[test]
fn runaway_recursion_is_reported() {
    let err = error("fn f(n: number) -> number { return f(n + 1) }; f(0)");
    match err {
        RuntimeError::StackOverflow { depth } => assert_eq!(depth, MAX_CALL_DEPTH),
        other => panic!("expected stack overflow, got {other}"),
    }
}

#[test]
fn calling_nil_is_an_error() {
    let err = error("let f: fn() -> number; f()");
    assert!(matches!(err, RuntimeError::NilDereference));
}
