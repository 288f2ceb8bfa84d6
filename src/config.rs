use std::path::PathBuf;
use thiserror::Error;

pub const LOG_ENV: &str = "HARMONY_LOG";
pub const PATH_ENV: &str = "HARMONY_PATH";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Repl,
    Run { path: PathBuf, args: Vec<String> },
    Version,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mode: Mode,
    pub log_filter: String,
    /// Extra directories searched for user imports.
    pub search_paths: Vec<PathBuf>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown option `{0}`")]
    UnknownOption(String),
}

pub const USAGE: &str = "Usage: harmony [--version] [<file.hm> [args...]]";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(std::env::args().skip(1), |name| std::env::var(name).ok())
    }

    /// `args` excludes the program name.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut args = args.into_iter();
        let mode = match args.next() {
            None => Mode::Repl,
            Some(flag) if flag == "--version" || flag == "-V" => Mode::Version,
            Some(flag) if flag == "--help" || flag == "-h" => Mode::Help,
            Some(flag) if flag.starts_with('-') && flag.len() > 1 => {
                return Err(ConfigError::UnknownOption(flag))
            }
            Some(path) => Mode::Run {
                path: PathBuf::from(path),
                args: args.collect(),
            },
        };

        let log_filter = env(LOG_ENV)
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let search_paths = env(PATH_ENV)
            .map(|paths| {
                paths
                    .split(':')
                    .filter(|dir| !dir.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            mode,
            log_filter,
            search_paths,
        })
    }
}
