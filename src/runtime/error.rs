use crate::runtime::value::Value;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Result of evaluating a statement or expression. The error side carries
/// both genuine failures and non-local control flow.
pub type EvalResult<T = Value> = Result<T, Signal>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("Unknown symbol `{name}`")]
    UnknownSymbol { name: String },
    #[error("`{name}` is already declared in this scope")]
    Redeclaration { name: String },
    #[error("`{name}` has already been defined")]
    AlreadyDefined { name: String },
    #[error("{owner} has no method `{name}`")]
    UnknownMethod { owner: String, name: String },
    #[error("{owner} has no member `{name}`")]
    UnknownMember { owner: String, name: String },
    #[error("Module `{module}` has no export `{name}`")]
    UnknownExport { module: String, name: String },
    #[error("Unknown module `{name}`")]
    UnknownModule { name: String },
    #[error("Import cycle detected: {chain}")]
    ImportCycle { chain: String },
    #[error("Function `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("Key {key} not found")]
    MissingKey { key: String },
    #[error("Range error: {message}")]
    Range { message: String },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Modulo by zero")]
    ModuloByZero,
    #[error("Cannot convert {text:?} to a number")]
    NumberParse { text: String },
    #[error("Invalid format string {format:?}")]
    InvalidFormat { format: String },
    #[error("Dereference of nil pointer")]
    NilDereference,
    #[error("Cannot take the address of {what}")]
    NotAddressable { what: String },
    #[error("{message}")]
    ControlFlow { message: String },
    #[error("Switch has more than one default case")]
    DuplicateDefault,
    #[error("Constant `{name}` cannot be reassigned")]
    ConstantReassignment { name: String },
    #[error("Struct `{name}` cannot be assigned to")]
    StructWrite { name: String },
    #[error("Call stack exhausted after {depth} nested calls")]
    StackOverflow { depth: usize },
    #[error("I/O error: {message}")]
    Io { message: String },
    #[error("Syntax error in {path}: {message}")]
    Syntax { path: String, message: String },
    /// A thrown value that no try/catch handled.
    #[error("{message}")]
    Uncaught { message: String },
}

impl RuntimeError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        RuntimeError::Range {
            message: message.into(),
        }
    }
}

/// Non-local exits threaded through evaluation results.
#[derive(Debug)]
pub enum Signal {
    Break,
    Continue,
    Return(Value),
    Throw(Value),
    Error(RuntimeError),
    /// `os.exit(code)`: unwinds everything, including try/catch.
    Exit(i32),
}

impl From<RuntimeError> for Signal {
    fn from(err: RuntimeError) -> Self {
        Signal::Error(err)
    }
}
