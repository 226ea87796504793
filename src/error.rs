//! Typed errors for journal construction and configuration.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JournalError {
    /// Bad user-supplied value (e.g. a position that is neither long nor short).
    #[error("{0}")]
    InvalidArgument(String),
    /// Required slash-command option was not delivered by Discord.
    #[error("missing option '{0}'")]
    MissingOption(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
