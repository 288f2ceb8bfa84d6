use super::{error, output};
use crate::runtime::error::RuntimeError;
use pretty_assertions::assert_eq;

#[test]
fn bindings_copy_collections() {
    let source = r#"
let a = []number{1}
let b = a
b.append(2)
println(a.len(), b.len())
"#;
    assert_eq!(output(source), "1 2\n");
}

#[test]
fn pointers_alias_collections() {
    let source = r#"
let a = []number{1}
let p = &a
(*p).append(2)
p.append(3)
println(a)
"#;
    assert_eq!(output(source), "[]number{1, 2, 3}\n");
}

#[test]
fn slices_double_their_capacity() {
    let source = r#"
let s = []number{}
for i in 0..8 { s.append(i) }
println(s.len(), s.cap())
"#;
    assert_eq!(output(source), "9 16\n");
}

#[test]
fn array_literals_pad_and_bound_their_size() {
    assert_eq!(output("println([3]number{1})"), "[3]number{1, 0, 0}\n");
    assert!(matches!(
        error("[1]number{1, 2}"),
        RuntimeError::Range { .. }
    ));
    assert!(matches!(
        error(r#"[]number{1, "2"}"#),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn oversized_arrays_are_catchable_range_errors() {
    let source = r#"
let msg = try { let a = [1e12]number{} } catch e { e.message() }
println(msg.contains("exceeds"))
"#;
    assert_eq!(output(source), "true\n");
    assert!(matches!(
        error("let a: [20000000]bool"),
        RuntimeError::Range { .. }
    ));
}

#[test]
fn array_filter_pads_while_slice_filter_compacts() {
    let source = r#"
let even = fn(x: number) -> bool { return x % 2 == 0 }
println([4]number{1, 2, 3, 4}.filter(even))
println([]number{1, 2, 3, 4}.filter(even))
"#;
    assert_eq!(
        output(source),
        "[4]number{0, 2, 0, 4}\n[]number{2, 4}\n"
    );
}

#[test]
fn each_passes_index_when_asked() {
    let source = r#"
let s = []string{"a", "b"}
println(s.each(fn(i: number, x: string) -> string { return string(i) + x }))
println(s.each(fn(x: string) -> number { return x.len() }))
"#;
    assert_eq!(output(source), "[]string{\"0a\", \"1b\"}\n[]number{1, 1}\n");
}

#[test]
fn indexing_supports_negative_positions() {
    let source = r#"
let s = []number{1, 2, 3}
s[-1] = 30
println(s[0], s[-1], "hey"[1])
"#;
    assert_eq!(output(source), "1 30 e\n");
    assert!(matches!(
        error("[]number{1}[3]"),
        RuntimeError::IndexOutOfRange { index: 3, len: 1 }
    ));
}

#[test]
fn string_methods() {
    let source = r#"
let s = "Hello, World"
println(s.len(), s.index("World"), s.contains("lo"), s.substr(0, 5))
println(s.upper(), s.lower(), "  pad ".trim())
println(s.split(", "))
"#;
    assert_eq!(
        output(source),
        "12 7 true Hello\nHELLO, WORLD hello, world pad\n[]string{\"Hello\", \"World\"}\n"
    );
    assert!(matches!(
        error(r#""abc".substr(2, 1)"#),
        RuntimeError::Range { .. }
    ));
}

#[test]
fn map_methods() {
    let source = r#"
let m = map[string->number]{"a": 1, "b": 2, "c": 3}
m.pop("b")
m["z"] = 26
let other = map[string->number]{"c": 30, "d": 4}
println(m.intersect(other))
println(m.union(other))
println(m.values(), m["z"])
"#;
    assert_eq!(
        output(source),
        "map[string->number]{\"c\": 3}\n\
         map[string->number]{\"a\": 1, \"c\": 3, \"z\": 26, \"d\": 4}\n\
         [3]number{1, 3, 26} 26\n"
    );
    assert!(matches!(
        error(r#"map[string->number]{}["zzz"]"#),
        RuntimeError::MissingKey { .. }
    ));
}

#[test]
fn conversions() {
    let source = r#"
println(number("42") + 1, number(true), bool(""), bool([]number{1}), string(3.5))
let msg = try { number("abc") } catch e { e.message() }
println(msg)
"#;
    assert_eq!(
        output(source),
        "43 1 false true 3.5\nCannot convert \"abc\" to a number\n"
    );
}

#[test]
fn printf_formats_verbs() {
    let source = r#"printf("%s has %d items at %.2f%% %q %t\n", "cart", 3, 9.5, "x", true)"#;
    assert_eq!(output(source), "cart has 3 items at 9.50% \"x\" true\n");
    assert!(matches!(
        error(r#"printf("%d %d", 1)"#),
        RuntimeError::InvalidFormat { .. }
    ));
}

#[test]
fn typeof_reports_runtime_types() {
    let source = r#"println(typeof 1, typeof "s", typeof []number{}, typeof map[string->bool]{})"#;
    assert_eq!(output(source), "number string []number map[string->bool]\n");
}

#[test]
fn declared_and_inferred_types_are_enforced() {
    assert!(matches!(
        error(r#"let x: number = "a""#),
        RuntimeError::TypeMismatch { .. }
    ));
    assert!(matches!(
        error(r#"let x = 1; x = "s""#),
        RuntimeError::TypeMismatch { .. }
    ));
    assert!(matches!(
        error("const k = 1; k = 2"),
        RuntimeError::ConstantReassignment { .. }
    ));
    assert!(matches!(
        error("let a = 1; let a = 2"),
        RuntimeError::Redeclaration { .. }
    ));
    assert_eq!(output(r#"let v: any = 1; v = "s"; println(v)"#), "s\n");
}

#[test]
fn nil_coalescing() {
    let source = r#"
let p: *number
println(p ?? 5)
let m: map[string->number]
m ??= map[string->number]{"k": 1}
m ??= map[string->number]{}
println(m.len())
"#;
    assert_eq!(output(source), "5\n1\n");
    assert!(matches!(
        error("let p: *number; println(*p)"),
        RuntimeError::NilDereference
    ));
}

#[test]
fn arithmetic_edges() {
    assert_eq!(
        output(r#"let f = 6; f &= 3; println(f, 4 | 1, 7 % 3, "a" + "b", 1 / 4)"#),
        "2 5 1 ab 0.25\n"
    );
    assert!(matches!(error("1 / 0"), RuntimeError::DivisionByZero));
    assert!(matches!(error("1 % 0"), RuntimeError::ModuloByZero));
}

#[test]
fn address_of_a_call_result_boxes_it() {
    let source = r#"
fn make() -> number { return 4 }
let p = &make()
*p += 1
println(*p)
"#;
    assert_eq!(output(source), "5\n");
    assert!(matches!(
        error("let p = &3"),
        RuntimeError::NotAddressable { .. }
    ));
}
