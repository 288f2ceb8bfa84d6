use super::output;
use pretty_assertions::assert_eq;

#[test]
fn arithmetic_on_a_binding() {
    assert_eq!(output("let x = 3; println(x + 4);"), "7\n");
}

#[test]
fn recursive_factorial() {
    let source = "fn fact(n: number) -> number { if n <= 1 { return 1 }; return n * fact(n-1) }; println(fact(5));";
    assert_eq!(output(source), "120\n");
}

#[test]
fn slice_append_and_negative_get() {
    let source = "let s: []number = []number{1,2,3}; s.append(4); println(s.len(), s.get(-1));";
    assert_eq!(output(source), "4 4\n");
}

#[test]
fn map_set_keys_and_exists() {
    let source = r#"let m = map[string->number]{"a":1}; m.set("b",2); println(m.keys().len(), m.exists("a"));"#;
    assert_eq!(output(source), "2 true\n");
}

#[test]
fn store_through_pointer() {
    assert_eq!(output("let a = 10; let p = &a; *p = 11; println(a);"), "11\n");
}

#[test]
fn thrown_error_is_caught() {
    let source = r#"try { throw error("boom") } catch e { println(e.message()) }"#;
    assert_eq!(output(source), "boom\n");
}

#[test]
fn same_programs_without_semicolons() {
    let source = r#"
let a = 10
let p = &a
*p = 11
println(a)
"#;
    assert_eq!(output(source), "11\n");
}

#[test]
fn displayed_literals_parse_back_to_equal_values() {
    let source = r#"
let s = []string{"a", "b\"c"}
let m = map[string->number]{"x": 1, "y": 2.5}
let a = [2]bool{true}
println(s)
println(m)
println(a)
"#;
    let printed = output(source);
    assert_eq!(
        printed,
        "[]string{\"a\", \"b\\\"c\"}\nmap[string->number]{\"x\": 1, \"y\": 2.5}\n[2]bool{true, false}\n"
    );

    let lines: Vec<&str> = printed.lines().collect();
    let reparsed = format!(
        "println({} == {}, {}.len(), {}.len())",
        lines[2], lines[2], lines[0], lines[1]
    );
    assert_eq!(output(&reparsed), "true 2 2\n");
}

#[test]
fn dereferencing_an_address_yields_the_value() {
    let source = r#"
let x = []number{1, 2}
println(*(&x))
println(x)
"#;
    let printed = output(source);
    let lines: Vec<&str> = printed.lines().collect();
    assert_eq!(lines[0], lines[1]);
}

#[test]
fn union_into_empty_map_equals_intersection() {
    let source = r#"
let a = map[string->number]{"a": 1, "b": 2}
let b = map[string->number]{"b": 20, "c": 3}
let empty = map[string->number]{}
println(empty.union(a.intersect(b)))
println(a.intersect(b))
"#;
    assert_eq!(
        output(source),
        "map[string->number]{\"b\": 2}\nmap[string->number]{\"b\": 2}\n"
    );
}
