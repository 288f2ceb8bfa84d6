//! Tree-walking evaluator.
//!
//! Every evaluation step returns [`EvalResult`]; the error side doubles as
//! the channel for `break`, `continue`, `return`, `throw` and `os.exit`, so
//! unwinding is ordinary `?` propagation.

mod annotations;
mod assign;
mod calls;
mod expressions;
mod statements;
mod structs;

pub(crate) use expressions::binary_op;

use crate::{
    language::{
        ast::{ImportDecl, ImportSource, Program, Statement},
        parser::parse_program,
    },
    runtime::{
        builtins,
        environment::{DeclarationKind, Scope},
        error::{EvalResult, RuntimeError, RuntimeResult, Signal},
        modules,
        platform::{Platform, StdPlatform},
        reference::Reference,
        types::{InterfaceType, StructDefinition, Type},
        value::{ModuleValue, Value},
    },
};
use std::{
    collections::HashMap,
    io::{self, Write},
    path::{Path, PathBuf},
    rc::Rc,
};
use tracing::{debug, instrument};

/// Nested calls allowed before evaluation gives up.
pub const MAX_CALL_DEPTH: usize = 2048;

pub const SOURCE_EXTENSION: &str = "hm";

/// How a top-level evaluation ended.
#[derive(Debug)]
pub enum Completion {
    Value(Value),
    Exit(i32),
}

pub struct Interpreter {
    globals: Scope,
    modules: HashMap<String, Rc<ModuleValue>>,
    platform: Rc<dyn Platform>,
    out: Box<dyn Write>,
    imports: HashMap<PathBuf, Rc<ModuleValue>>,
    import_stack: Vec<PathBuf>,
    base_dirs: Vec<PathBuf>,
    search_paths: Vec<PathBuf>,
    script_args: Vec<String>,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Scope::root();
        builtins::install(&globals);
        Self {
            globals,
            modules: modules::standard_modules(),
            platform: Rc::new(StdPlatform),
            out: Box::new(io::stdout()),
            imports: HashMap::new(),
            import_stack: Vec::new(),
            base_dirs: Vec::new(),
            search_paths: Vec::new(),
            script_args: Vec::new(),
            depth: 0,
        }
    }

    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    pub fn with_platform(mut self, platform: Rc<dyn Platform>) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.script_args = args;
        self
    }

    pub fn platform(&self) -> Rc<dyn Platform> {
        self.platform.clone()
    }

    pub fn script_args(&self) -> &[String] {
        &self.script_args
    }

    /// Fresh top-level scope whose parent holds the built-ins.
    pub fn root_scope(&self) -> Scope {
        self.globals.child()
    }

    pub(crate) fn write_out(&mut self, text: &str) -> RuntimeResult<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|err| RuntimeError::Io {
                message: err.to_string(),
            })
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }

    /// Runs a whole program read from `path` (or from memory when `None`).
    pub fn run_program(
        &mut self,
        program: &Program,
        path: Option<&Path>,
    ) -> RuntimeResult<Completion> {
        let scope = self.root_scope();
        let base = path
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        self.base_dirs.push(base);
        let result = self.evaluate(program, &scope);
        self.base_dirs.pop();
        self.flush();
        result
    }

    /// Evaluates `program` in `scope`. The value is that of a trailing
    /// expression statement, or nil.
    pub fn evaluate(&mut self, program: &Program, scope: &Scope) -> RuntimeResult<Completion> {
        match self.execute_statements(&program.statements, scope) {
            Ok(value) => Ok(Completion::Value(value)),
            Err(Signal::Exit(code)) => Ok(Completion::Exit(code)),
            Err(signal) => Err(escaped(signal)),
        }
    }

    /// Runs a statement list with its declarations hoisted: every function,
    /// struct and interface is announced first and completed second, so the
    /// list can refer to them in any order.
    pub(crate) fn execute_statements(
        &mut self,
        statements: &[Statement],
        scope: &Scope,
    ) -> EvalResult {
        self.hoist_declarations(statements, scope)?;

        let mut last = Value::Nil;
        for (idx, statement) in statements.iter().enumerate() {
            match statement {
                Statement::Expr(stmt) => {
                    let value = self.eval_expr(&stmt.expr, scope)?;
                    if idx + 1 == statements.len() {
                        last = value;
                    }
                }
                other => self.execute_statement(other, scope)?,
            }
        }
        Ok(last)
    }

    fn hoist_declarations(&mut self, statements: &[Statement], scope: &Scope) -> EvalResult<()> {
        for statement in statements {
            match statement {
                Statement::Function(decl) => {
                    scope.declare_forward(&decl.name.name, DeclarationKind::Function, None)?
                }
                Statement::Struct(decl) => scope.declare_forward(
                    &decl.name.name,
                    DeclarationKind::Struct,
                    Some(Type::Struct(StructDefinition::shell(&decl.name.name))),
                )?,
                Statement::Interface(decl) => scope.declare_forward(
                    &decl.name.name,
                    DeclarationKind::Interface,
                    Some(Type::Interface(InterfaceType::shell(&decl.name.name))),
                )?,
                _ => {}
            }
        }

        // Aliases first, so signatures below can name them.
        for statement in statements {
            if let Statement::TypeAlias(decl) = statement {
                let ty = self.resolve_type(&decl.ty.ty, scope)?;
                scope.declare(Reference::variable(
                    &decl.name.name,
                    Type::Type,
                    Value::Type(ty),
                    true,
                ))?;
            }
        }

        for statement in statements {
            match statement {
                Statement::Function(decl) => {
                    let function = self.make_function(&decl.name.name, &decl.function, scope)?;
                    scope.complete_declaration(
                        &decl.name.name,
                        Reference::function(&decl.name.name, function),
                    )?;
                }
                Statement::Struct(decl) => self.complete_struct(decl, scope)?,
                Statement::Interface(decl) => self.complete_interface(decl, scope)?,
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn enter_call(&mut self) -> RuntimeResult<()> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow { depth: self.depth });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn execute_import(&mut self, decl: &ImportDecl, scope: &Scope) -> EvalResult<()> {
        let (module, default_name) = match &decl.source {
            ImportSource::Name(name) => match self.modules.get(name) {
                Some(module) => (module.clone(), name.clone()),
                None => {
                    let file = format!("{name}.{SOURCE_EXTENSION}");
                    let path = self.locate_import(&file).ok_or_else(|| {
                        RuntimeError::UnknownModule { name: name.clone() }
                    })?;
                    (self.import_file(&path)?, name.clone())
                }
            },
            ImportSource::Path(raw) => {
                let path = self
                    .locate_import(raw)
                    .ok_or_else(|| RuntimeError::UnknownModule { name: raw.clone() })?;
                let stem = Path::new(raw)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or(raw)
                    .to_string();
                (self.import_file(&path)?, stem)
            }
        };

        let binding = decl
            .alias
            .as_ref()
            .map(|alias| alias.name.clone())
            .unwrap_or(default_name);
        scope.declare(Reference::variable(
            binding,
            Type::Module,
            Value::Module(module),
            true,
        ))?;
        Ok(())
    }

    /// Looks for `file` next to the importing file, then along the search path.
    fn locate_import(&self, file: &str) -> Option<PathBuf> {
        let relative = Path::new(file);
        if relative.is_absolute() {
            return relative.exists().then(|| relative.to_path_buf());
        }
        let base = self
            .base_dirs
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        std::iter::once(base)
            .chain(self.search_paths.iter().cloned())
            .map(|dir| dir.join(relative))
            .find(|candidate| candidate.is_file())
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    fn import_file(&mut self, path: &Path) -> EvalResult<Rc<ModuleValue>> {
        let canonical = path.canonicalize().map_err(|err| RuntimeError::Io {
            message: format!("{}: {err}", path.display()),
        })?;
        if let Some(module) = self.imports.get(&canonical) {
            debug!("import served from cache");
            return Ok(module.clone());
        }
        if self.import_stack.contains(&canonical) {
            let chain = self
                .import_stack
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(RuntimeError::ImportCycle { chain }.into());
        }

        let display = canonical.display().to_string();
        let source = self
            .platform
            .fs_read(&display)
            .map_err(|message| RuntimeError::Io { message })?;
        let program = parse_program(&source).map_err(|errors| RuntimeError::Syntax {
            path: display.clone(),
            message: errors.summary(),
        })?;

        let scope = self.root_scope();
        self.import_stack.push(canonical.clone());
        self.base_dirs.push(
            canonical
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        );
        let result = self.execute_statements(&program.statements, &scope);
        self.base_dirs.pop();
        self.import_stack.pop();
        match result {
            Ok(_) => {}
            Err(Signal::Exit(code)) => return Err(Signal::Exit(code)),
            Err(signal) => return Err(escaped(signal).into()),
        }

        let name = canonical
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("module")
            .to_string();
        let exports = scope
            .bindings()
            .into_iter()
            .map(|(name, reference)| (name, reference.load()))
            .collect();
        let module = Rc::new(ModuleValue::new(name, exports));
        debug!(exports = module.exports.len(), "import evaluated");
        self.imports.insert(canonical, module.clone());
        Ok(module)
    }
}

/// Converts a signal that left every construct able to handle it.
fn escaped(signal: Signal) -> RuntimeError {
    match signal {
        Signal::Error(err) => err,
        Signal::Throw(value) => RuntimeError::Uncaught {
            message: value.display(),
        },
        Signal::Break => RuntimeError::ControlFlow {
            message: "`break` outside of a loop".into(),
        },
        Signal::Continue => RuntimeError::ControlFlow {
            message: "`continue` outside of a loop".into(),
        },
        Signal::Return(_) => RuntimeError::ControlFlow {
            message: "`return` outside of a function".into(),
        },
        Signal::Exit(code) => RuntimeError::ControlFlow {
            message: format!("exit({code}) escaped the driver"),
        },
    }
}
