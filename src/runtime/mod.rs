pub mod builtins;
pub mod environment;
pub mod error;
pub mod format;
pub mod interpreter;
pub mod methods;
pub mod modules;
pub mod platform;
pub mod reference;
pub mod types;
pub mod value;

pub use interpreter::{Completion, Interpreter};
pub use value::Value;
