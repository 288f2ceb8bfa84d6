use std::{
    env, fs,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};
use tempfile::tempdir;

fn bin_path() -> String {
    if let Some(path) = option_env!("CARGO_BIN_EXE_harmony") {
        return path.to_string();
    }
    let mut fallback =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("manifest dir not set by cargo"));
    fallback.push("target");
    fallback.push("debug");
    fallback.push("harmony");
    if cfg!(windows) {
        fallback.set_extension("exe");
    }
    if fallback.exists() {
        return fallback.to_string_lossy().into_owned();
    }
    panic!(
        "binary path not set by cargo test and fallback {:?} not found",
        fallback
    );
}

fn script(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, source).expect("write script");
    path
}

fn run(args: &[&str], dir: &Path) -> Output {
    Command::new(bin_path())
        .current_dir(dir)
        .args(args)
        .env_remove("HARMONY_PATH")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run harmony")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn runs_a_script_and_forwards_arguments() {
    let dir = tempdir().expect("tempdir");
    script(
        dir.path(),
        "main.hm",
        "import os\nprintln(\"args:\", os.args())\n",
    );
    let output = run(&["main.hm", "one", "two"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "args: []string{\"one\", \"two\"}\n");
}

#[test]
fn uncaught_errors_exit_with_one() {
    let dir = tempdir().expect("tempdir");
    script(dir.path(), "bad.hm", "println(\"before\")\nthrow error(\"bad\")\n");
    let output = run(&["bad.hm"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "before\n");
    assert!(stderr(&output).contains("Runtime error: bad"));
}

#[test]
fn syntax_errors_exit_with_two() {
    let dir = tempdir().expect("tempdir");
    script(dir.path(), "broken.hm", "let = 4\n");
    let output = run(&["broken.hm"], dir.path());
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).is_empty());
    assert!(!stderr(&output).is_empty());
}

#[test]
fn os_exit_sets_the_status() {
    let dir = tempdir().expect("tempdir");
    script(dir.path(), "quit.hm", "import os\nprint(\"partial\")\nos.exit(7)\n");
    let output = run(&["quit.hm"], dir.path());
    assert_eq!(output.status.code(), Some(7));
    assert_eq!(stdout(&output), "partial");
}

#[test]
fn missing_files_and_unknown_flags() {
    let dir = tempdir().expect("tempdir");
    let output = run(&["nope.hm"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    let output = run(&["--turbo"], dir.path());
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--turbo"));
}

#[test]
fn version_flag() {
    let dir = tempdir().expect("tempdir");
    let output = run(&["--version"], dir.path());
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        format!("harmony {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn search_path_comes_from_the_environment() {
    let lib = tempdir().expect("lib dir");
    let app = tempdir().expect("app dir");
    script(lib.path(), "shared.hm", "let answer = 42\n");
    script(app.path(), "main.hm", "import shared\nprintln(shared.answer)\n");
    let output = Command::new(bin_path())
        .current_dir(app.path())
        .arg("main.hm")
        .env("HARMONY_PATH", lib.path())
        .stdin(Stdio::null())
        .output()
        .expect("failed to run harmony");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "42\n");
}

#[test]
fn repl_reads_standard_input() {
    let mut child = Command::new(bin_path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start repl");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"let x = 20\nx + 22\nexit\n")
        .expect("write to repl");
    let output = child.wait_with_output().expect("repl output");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("42"));
}
