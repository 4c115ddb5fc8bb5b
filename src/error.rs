use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures of a benchmark run.
///
/// A parity mismatch is deliberately absent: it is recorded on the
/// [`crate::model::ValidityVerdict`] and the run continues.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("{what} not found: {}", path.display())]
    MissingResource { what: &'static str, path: PathBuf },

    #[error("command failed: {command}\nstatus={status}\nstderr:\n{stderr}")]
    ExternalTool {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{0} requested for empty sample set")]
    EmptyInput(&'static str),

    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BenchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
