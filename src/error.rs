//! Error taxonomy for view resolution, configuration, and compiler probes.
//!
//! Only `AuditError` ever reaches a caller. `CompileError` is produced by
//! `DirectiveCompiler` implementations and is swallowed by the analysis
//! passes that probe the compiler.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    /// The view name did not resolve to a file under any configured root.
    #[error("view [{name}] not found")]
    NotFound { name: String, tried: Vec<PathBuf> },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid host version '{0}', expected major[.minor[.patch]]")]
    InvalidVersion(String),
}

impl AuditError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AuditError::NotFound { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("directive @{0} requires an expression")]
    MissingExpression(String),

    #[error("unbalanced parentheses in @{0}")]
    UnbalancedParentheses(String),

    #[error("unterminated {0} block")]
    UnterminatedBlock(&'static str),
}

pub type Result<T> = std::result::Result<T, AuditError>;
