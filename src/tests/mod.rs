//! End-to-end programs evaluated through the public interpreter API.

mod control_flow;
mod functions;
mod imports;
mod repl;
mod scenarios;
mod structs;
mod values;

use crate::{
    language::parser::parse_program,
    runtime::{error::RuntimeError, Completion, Interpreter},
};
use std::{
    cell::RefCell,
    io::{self, Write},
    path::{Path, PathBuf},
    rc::Rc,
    thread,
};

/// Deep programs recurse far past the default test-thread stack.
const TEST_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Output sink that stays readable after the interpreter takes ownership.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) struct Outcome {
    pub output: String,
    /// `Some(code)` when the program called `os.exit`.
    pub result: Result<Option<i32>, RuntimeError>,
}

#[derive(Default)]
pub(crate) struct Setup {
    pub path: Option<PathBuf>,
    pub search_paths: Vec<PathBuf>,
    pub args: Vec<String>,
}

pub(crate) fn interpreter(out: &SharedBuffer) -> Interpreter {
    Interpreter::new().with_output(Box::new(out.clone()))
}

/// Parses and runs `source` on a thread with a generous stack.
pub(crate) fn run_with(source: &str, setup: Setup) -> Outcome {
    let source = source.to_string();
    thread::Builder::new()
        .stack_size(TEST_STACK_SIZE)
        .spawn(move || {
            let program = parse_program(&source).expect("program should parse");
            let out = SharedBuffer::default();
            let mut interp = interpreter(&out)
                .with_search_paths(setup.search_paths)
                .with_args(setup.args);
            let result = interp
                .run_program(&program, setup.path.as_deref())
                .map(|completion| match completion {
                    Completion::Value(_) => None,
                    Completion::Exit(code) => Some(code),
                });
            Outcome {
                output: out.contents(),
                result,
            }
        })
        .expect("spawn evaluator thread")
        .join()
        .expect("evaluator thread panicked")
}

pub(crate) fn run(source: &str) -> Outcome {
    run_with(source, Setup::default())
}

pub(crate) fn run_file(path: &Path, search_paths: Vec<PathBuf>) -> Outcome {
    let source = std::fs::read_to_string(path).expect("read script");
    run_with(
        &source,
        Setup {
            path: Some(path.to_path_buf()),
            search_paths,
            ..Setup::default()
        },
    )
}

/// Output of a program that must finish without error.
pub(crate) fn output(source: &str) -> String {
    let outcome = run(source);
    if let Err(err) = &outcome.result {
        panic!("program failed: {err}\noutput so far:\n{}", outcome.output);
    }
    outcome.output
}

/// Error of a program that must fail.
pub(crate) fn error(source: &str) -> RuntimeError {
    match run(source).result {
        Ok(_) => panic!("program should fail:\n{source}"),
        Err(err) => err,
    }
}
