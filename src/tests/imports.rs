use super::{error, interpreter, output, run_file, run_with, Setup, SharedBuffer};
use crate::{
    language::parser::parse_program,
    runtime::{error::RuntimeError, platform::Platform, Completion},
};
use pretty_assertions::assert_eq;
use std::{fs, path::Path, rc::Rc};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, source: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create module dir");
    }
    fs::write(path, source).expect("write module");
}

#[test]
fn standard_modules() {
    let source = r#"
import math
import math as m
println(math.sqrt(16), m.max(2, 3), math.floor(math.pi), math.clamp(12, 0, 10))
"#;
    assert_eq!(output(source), "4 3 3 10\n");
}

#[test]
fn unknown_modules_and_exports() {
    assert!(matches!(
        error("import nothing_here"),
        RuntimeError::UnknownModule { .. }
    ));
    assert!(matches!(
        error("import math; math.nope"),
        RuntimeError::UnknownExport { .. }
    ));
}

#[test]
fn file_imports_resolve_relative_to_the_importer() {
    let dir = tempdir().expect("tempdir");
    write(
        dir.path(),
        "lib/util.hm",
        "fn double(n: number) -> number { return n * 2 }\nlet version = \"1.0\"\n",
    );
    write(
        dir.path(),
        "main.hm",
        "import \"lib/util.hm\"\nimport \"lib/util.hm\" as u\nprintln(util.double(21), u.version)\n",
    );
    let outcome = run_file(&dir.path().join("main.hm"), Vec::new());
    assert!(outcome.result.is_ok(), "{:?}", outcome.result.err());
    assert_eq!(outcome.output, "42 1.0\n");
}

#[test]
fn modules_run_once_and_are_shared() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "noisy.hm", "println(\"loading\")\nlet n = 1\n");
    write(
        dir.path(),
        "main.hm",
        "import \"noisy.hm\"\nimport \"noisy.hm\" as again\nprintln(noisy.n + again.n)\n",
    );
    let outcome = run_file(&dir.path().join("main.hm"), Vec::new());
    assert_eq!(outcome.output, "loading\n2\n");
}

#[test]
fn bare_names_fall_back_to_search_paths() {
    let lib = tempdir().expect("lib dir");
    let app = tempdir().expect("app dir");
    write(lib.path(), "helpers.hm", "fn greet() -> string { return \"hey\" }\n");
    write(app.path(), "main.hm", "import helpers\nprintln(helpers.greet())\n");
    let outcome = run_file(&app.path().join("main.hm"), vec![lib.path().to_path_buf()]);
    assert_eq!(outcome.output, "hey\n");
}

#[test]
fn import_cycles_are_detected() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "a.hm", "import \"b.hm\"\n");
    write(dir.path(), "b.hm", "import \"a.hm\"\n");
    write(dir.path(), "main.hm", "import \"a.hm\"\n");
    let outcome = run_file(&dir.path().join("main.hm"), Vec::new());
    assert!(matches!(
        outcome.result,
        Err(RuntimeError::ImportCycle { .. })
    ));
}

#[test]
fn os_files_and_arguments() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("note.txt");
    let source = format!(
        r#"
import os
let path = {:?}
println(os.exists(path))
os.write_file(path, "hi")
println(os.read_file(path), os.exists(path), os.args())
"#,
        path.display().to_string()
    );
    let outcome = run_with(
        &source,
        Setup {
            args: vec!["a".into(), "b".into()],
            ..Setup::default()
        },
    );
    assert!(outcome.result.is_ok(), "{:?}", outcome.result.err());
    assert_eq!(outcome.output, "false\nhi true []string{\"a\", \"b\"}\n");
}

#[test]
fn random_values_stay_in_range() {
    let source = r#"
import random
let n = random.int(1, 3)
let pick = random.choice([]any{"x"})
println(n >= 1 && n <= 3, pick, typeof random.bool())
"#;
    assert_eq!(output(source), "true x bool\n");
    assert!(matches!(
        error("import random; random.choice([]any{})"),
        RuntimeError::Range { .. }
    ));
}

struct FixedClock;

impl Platform for FixedClock {
    fn now_ms(&self) -> i128 {
        1_000
    }
    fn sleep_ms(&self, _millis: i128) {}
    fn fs_exists(&self, _path: &str) -> bool {
        false
    }
    fn fs_read(&self, path: &str) -> Result<String, String> {
        Err(format!("{path}: not found"))
    }
    fn fs_write(&self, _path: &str, _contents: &str) -> Result<(), String> {
        Ok(())
    }
    fn env_var(&self, name: &str) -> Option<String> {
        (name == "MODE").then(|| "test".to_string())
    }
}

#[test]
fn native_modules_go_through_the_platform() {
    let program = parse_program(
        r#"
import time
import os
time.sleep(50)
println(time.now(), time.since(400), os.env("MODE"), os.env("OTHER") == "")
"#,
    )
    .expect("parse");
    let out = SharedBuffer::default();
    let mut interp = interpreter(&out).with_platform(Rc::new(FixedClock));
    let completion = interp.run_program(&program, None).expect("run");
    assert!(matches!(completion, Completion::Value(_)));
    assert_eq!(out.contents(), "1000 600 test true\n");
}
