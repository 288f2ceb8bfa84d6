use harmony_lang::{
    config::{Config, Mode, USAGE},
    diagnostics::{emit_syntax_errors, report_io_error, report_runtime_error},
    language::parser::parse_program,
    repl,
    runtime::{Completion, Interpreter},
};
use std::{fs, io, path::Path, process};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Evaluation recurses on the native stack; give it room for deep programs.
const EVAL_STACK_SIZE: usize = 256 * 1024 * 1024;

fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };
    init_tracing(&config.log_filter);

    let worker = std::thread::Builder::new()
        .name("harmony".into())
        .stack_size(EVAL_STACK_SIZE)
        .spawn(move || run(config));
    let code = match worker {
        Ok(handle) => handle.join().unwrap_or_else(|_| {
            eprintln!("interpreter thread panicked");
            1
        }),
        Err(err) => {
            eprintln!("failed to start interpreter thread: {err}");
            1
        }
    };
    process::exit(code);
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(config: Config) -> i32 {
    let interp = Interpreter::new().with_search_paths(config.search_paths.clone());
    match config.mode {
        Mode::Version => {
            println!("harmony {}", env!("CARGO_PKG_VERSION"));
            0
        }
        Mode::Help => {
            println!("{USAGE}");
            0
        }
        Mode::Repl => {
            let mut interp = interp;
            let stdin = io::stdin();
            repl::run(&mut interp, stdin.lock(), io::stdout())
        }
        Mode::Run { path, args } => run_file(interp.with_args(args), &path),
    }
}

fn run_file(mut interp: Interpreter, path: &Path) -> i32 {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            report_io_error(path, &err);
            return 1;
        }
    };
    let program = match parse_program(&source) {
        Ok(program) => program,
        Err(errors) => {
            emit_syntax_errors(&path.display().to_string(), &source, &errors);
            return 2;
        }
    };
    debug!(path = %path.display(), statements = program.statements.len(), "running");
    match interp.run_program(&program, Some(path)) {
        Ok(Completion::Value(_)) => 0,
        Ok(Completion::Exit(code)) => code,
        Err(err) => {
            report_runtime_error(&err);
            1
        }
    }
}
