use super::{error, output};
use crate::runtime::error::RuntimeError;
use pretty_assertions::assert_eq;

const POINT: &str = r#"
struct Point {
    x: number,
    y: number = 10,
    static count: number = 0,
    fn sum() -> number { return self.x + self.y }
    fn shift(dx: number) { self.x += dx }
}
"#;

fn with_point(body: &str) -> String {
    output(&format!("{POINT}\n{body}"))
}

#[test]
fn literals_methods_and_statics() {
    let body = r#"
let p = Point { x: 1 }
p.shift(4)
Point.count += 1
println(p, p.sum(), Point.count, p.count)
"#;
    assert_eq!(with_point(body), "Point{x: 5, y: 10} 15 1 1\n");
}

#[test]
fn instances_are_copied_on_assignment() {
    let body = r#"
let p = Point { x: 5 }
let q = p
q.x = 100
println(p.x, q.x)
"#;
    assert_eq!(with_point(body), "5 100\n");
}

#[test]
fn pointers_reach_the_original_instance() {
    let body = r#"
let p = Point { x: 5 }
let ptr = &p
ptr.x = 7
ptr.shift(1)
println(p.x, (*ptr).sum())
"#;
    assert_eq!(with_point(body), "8 18\n");
}

#[test]
fn literal_errors() {
    let unknown = format!("{POINT}\nPoint {{ z: 1 }}");
    assert!(matches!(
        error(&unknown),
        RuntimeError::UnknownMember { .. }
    ));
    let mistyped = format!("{POINT}\nPoint {{ x: \"one\" }}");
    assert!(matches!(
        error(&mistyped),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn struct_bindings_cannot_be_overwritten() {
    let source = format!("{POINT}\nPoint = 3");
    assert!(matches!(error(&source), RuntimeError::StructWrite { .. }));
}

#[test]
fn self_referential_fields_through_pointers() {
    let source = r#"
struct Node { value: number, next: *Node }
let tail = Node { value: 1 }
let head = Node { value: 2, next: &tail }
println(head.next.value, tail.next == nil)
"#;
    assert_eq!(output(source), "1 true\n");
}

#[test]
fn interfaces_are_satisfied_structurally() {
    let source = r#"
interface Shape { fn area() -> number }
struct Square { side: number, fn area() -> number { return self.side * self.side } }
let s: Shape = Square { side: 3 }
println(s.area())
"#;
    assert_eq!(output(source), "9\n");

    let source = r#"
interface Shape { fn area() -> number }
struct Label { text: string }
let bad: Shape = Label { text: "x" }
"#;
    assert!(matches!(error(source), RuntimeError::TypeMismatch { .. }));
}

#[test]
fn structs_can_be_used_before_their_declaration() {
    let source = r#"
let w = Wrapper { inner: Inner { n: 4 } }
println(w.inner.n)
struct Wrapper { inner: Inner }
struct Inner { n: number }
"#;
    assert_eq!(output(source), "4\n");
}
