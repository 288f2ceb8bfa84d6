#![allow(clippy::collapsible_if)]

pub mod config;
pub mod diagnostics;
pub mod language;
pub mod repl;
pub mod runtime;

#[cfg(test)]
mod tests;
