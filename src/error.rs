//! Typed errors for registry generation.
//!
//! Only configuration-time and output-time failures are fatal. Per-file read
//! errors are logged by the dispatcher and never abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the library.
#[derive(Error, Debug)]
pub enum FuncregError {
    /// The language tag is empty or malformed.
    #[error("unsupported language: {0:?}")]
    UnsupportedLanguage(String),

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An include/exclude glob failed to compile.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Reading a source file failed.
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rendering or writing the registry failed.
    #[error("writing output: {0}")]
    Output(String),
}

impl FuncregError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FuncregError>;
