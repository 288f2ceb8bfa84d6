use crate::{
    diagnostics::{emit_syntax_errors, report_runtime_error},
    language::{ast::Statement, parser::parse_program},
    runtime::{Completion, Interpreter, Value},
};
use std::io::{BufRead, Write};
use tracing::debug;

const PROMPT: &str = "> ";

/// Reads lines from `input` until EOF or `exit`, evaluating each one in a
/// scope that persists across lines. Returns the process exit status.
pub fn run<R: BufRead, W: Write>(interp: &mut Interpreter, input: R, mut prompt: W) -> i32 {
    let scope = interp.root_scope();
    let mut lines = input.lines();
    loop {
        let _ = write!(prompt, "{PROMPT}");
        let _ = prompt.flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(err)) => {
                debug!(error = %err, "stdin closed");
                return 0;
            }
            None => return 0,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            return 0;
        }

        let program = match parse_program(line) {
            Ok(program) => program,
            Err(errors) => {
                emit_syntax_errors("<repl>", line, &errors);
                continue;
            }
        };
        let echoes = matches!(program.statements.last(), Some(Statement::Expr(_)));
        match interp.evaluate(&program, &scope) {
            Ok(Completion::Value(value)) if echoes => {
                let value = match value {
                    Value::Pointer(pointer) => pointer.load().unwrap_or(Value::Nil),
                    other => other,
                };
                let _ = interp.write_out(&format!("{}\n", value.repr()));
            }
            Ok(Completion::Value(_)) => {}
            Ok(Completion::Exit(code)) => {
                interp.flush();
                return code;
            }
            Err(err) => report_runtime_error(&err),
        }
        interp.flush();
    }
}
