use super::{error, output, run};
use crate::runtime::error::RuntimeError;
use pretty_assertions::assert_eq;

#[test]
fn three_clause_loop_with_break_and_continue() {
    let source = r#"
let total = 0
for let i = 0; i < 10; i++ {
    if i % 2 == 0 { continue }
    if i > 7 { break }
    total += i
}
println(total)
"#;
    assert_eq!(output(source), "16\n");
}

#[test]
fn condition_only_and_bare_loops() {
    let source = r#"
let n = 0
for n < 3 { n++ }
let spins = 0
for {
    spins++
    if spins == 4 { break }
}
println(n, spins)
"#;
    assert_eq!(output(source), "3 4\n");
}

#[test]
fn for_in_over_range_binds_index_and_value() {
    assert_eq!(
        output("for i, x in 10..12 { println(i, x) }"),
        "0 10\n1 11\n2 12\n"
    );
}

#[test]
fn for_in_over_map_walks_insertion_order() {
    let source = r#"
let m = map[string->number]{"b": 2, "a": 1}
for k, v in m { printf("%s=%v;", k, v) }
println()
"#;
    assert_eq!(output(source), "b=2;a=1;\n");
}

#[test]
fn loop_variable_is_fresh_per_iteration() {
    let source = r#"
let fns = []fn() -> number{}
for x in 1..3 {
    fns.append(fn() -> number { return x * 10 })
}
println(fns.get(0)(), fns.get(2)())
"#;
    assert_eq!(output(source), "10 30\n");
}

#[test]
fn ranges_with_step_and_descending_bounds() {
    assert_eq!(output("println(0..10 step 5)"), "[3]number{0, 5, 10}\n");
    assert_eq!(output("println(3..1)"), "[3]number{3, 2, 1}\n");
    assert!(matches!(
        error("let r = 0..4 step 0"),
        RuntimeError::Range { .. }
    ));
}

#[test]
fn if_and_block_are_expressions() {
    let source = r#"
let x = if 1 > 2 { "a" } else { "b" }
let y = { let t = 2; t * 3 }
println(x, y, 1 < 2 ? "yes" : "no")
"#;
    assert_eq!(output(source), "b 6 yes\n");
}

#[test]
fn switch_matches_by_value() {
    let source = r#"
fn describe(n: number) -> string {
    return switch n {
        case 1 { "one" }
        case 2, 3 { "few" }
        default { "many" }
    }
}
println(describe(1), describe(3), describe(9))
let key = []number{1}
println(switch key { case []number{1} { "equal" } default { "different" } })
"#;
    assert_eq!(output(source), "one few many\nequal\n");
}

#[test]
fn switch_rejects_two_defaults() {
    let err = error("switch 1 { default { 1 } default { 2 } }");
    assert!(matches!(err, RuntimeError::DuplicateDefault));
}

#[test]
fn stray_control_flow_is_an_error() {
    assert!(matches!(error("break"), RuntimeError::ControlFlow { .. }));
    assert!(matches!(error("continue"), RuntimeError::ControlFlow { .. }));
    assert!(matches!(error("return 1"), RuntimeError::ControlFlow { .. }));
}

#[test]
fn try_catches_runtime_errors_and_passes_values_through() {
    let source = r#"
let r = try { 1 / 0 } catch e { e.message() }
let ok = try { 5 } catch e { 0 }
println(r, ok)
let caught = try { throw "plain" } catch e { e }
println(caught)
"#;
    assert_eq!(output(source), "Division by zero 5\nplain\n");
}

#[test]
fn try_does_not_swallow_loop_control() {
    let source = r#"
let seen = 0
for i in 0..5 {
    try { if i == 2 { break } } catch e { println("caught") }
    seen++
}
println(seen)
"#;
    assert_eq!(output(source), "2\n");
}

#[test]
fn uncaught_throw_surfaces_its_message() {
    let err = error(r#"throw error("bad input")"#);
    assert_eq!(err.to_string(), "bad input");
}

#[test]
fn exit_is_not_catchable() {
    let outcome = run(r#"
import os
try { os.exit(3) } catch e { println("caught") }
println("after")
"#);
    assert_eq!(outcome.output, "");
    assert_eq!(outcome.result.ok(), Some(Some(3)));
}

#[test]
fn exit_status_must_fit_the_platform() {
    let outcome = run(r#"
import os
let msg = try { os.exit(4294967296) } catch e { e.message() }
println(msg)
"#);
    assert_eq!(outcome.result.ok(), Some(None));
    assert_eq!(
        outcome.output,
        "Range error: exit status 4294967296 is out of range\n"
    );
}
