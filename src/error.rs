//! Crate-wide error type.

use crate::core::parser::ValidationError;
use std::path::PathBuf;

/// Errors surfaced while declaring, synthesizing, or verifying a stack.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Parse(String),

    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error("template error: {0}")]
    Template(String),

    #[error("synthesis failed: {0}")]
    Synth(String),

    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("tripwire: {0}")]
    Tripwire(String),

    #[error("{0} audit warning(s)")]
    Audit(usize),
}

impl Error {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
