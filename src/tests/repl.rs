use super::{interpreter, SharedBuffer};
use crate::repl;
use pretty_assertions::assert_eq;
use std::io::Cursor;

fn session(input: &str) -> (i32, String, String) {
    let out = SharedBuffer::default();
    let mut interp = interpreter(&out);
    let mut prompts = Vec::new();
    let code = repl::run(&mut interp, Cursor::new(input.to_string()), &mut prompts);
    (code, out.contents(), String::from_utf8_lossy(&prompts).into_owned())
}

#[test]
fn bindings_persist_between_lines() {
    let (code, out, prompts) = session("let x = 2\n\nx * 3\n\"hi\"\nprintln(x)\nexit\nprintln(99)\n");
    assert_eq!(code, 0);
    assert_eq!(out, "6\n\"hi\"\n2\nnil\n");
    assert_eq!(prompts, "> ".repeat(6));
}

#[test]
fn errors_do_not_end_the_session() {
    let (code, out, _) = session("undefined_name\nlet y = (\nlet y = 1\ny\n");
    assert_eq!(code, 0);
    assert_eq!(out, "1\n");
}

#[test]
fn exit_status_comes_from_os_exit() {
    let (code, out, _) = session("import os\nprintln(\"bye\")\nos.exit(4)\nprintln(\"never\")\n");
    assert_eq!(code, 4);
    assert_eq!(out, "bye\nnil\n");
}

#[test]
fn trailing_expressions_echo_even_when_nil() {
    let (_, out, _) = session("nil\nlet n = 5\nlet p = &n\np\nlet q: *number\nq\n");
    assert_eq!(out, "nil\n5\nnil\n");
}
