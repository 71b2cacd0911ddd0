//! Error types for deepresearch.
//!
//! Library crates use [`ResearchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all deepresearch operations.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// Configuration loading or validation error (including a missing credential).
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure: timeout, connection refused, DNS.
    #[error("network error: {0}")]
    Network(String),

    /// An upstream service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Pipeline construction rejected (bad dependency wiring).
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Instruction template could not be rendered for a stage.
    #[error("template error in stage '{stage}': {message}")]
    Template { stage: String, message: String },

    /// A stage's agent failed to produce its artifact.
    #[error("stage '{stage}' failed: {message}")]
    Agent { stage: String, message: String },

    /// Background worker running a pipeline or search did not complete.
    #[error("worker error: {0}")]
    Worker(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ResearchError>;

impl ResearchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an agent failure for the given stage.
    pub fn agent(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Agent {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure happened below HTTP (no response was received).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
