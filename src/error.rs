//! Error taxonomy for the fetch and repackage pipeline.
//!
//! Tool failures and "the tool succeeded but left something unexpected"
//! are separate variants so an operator can tell them apart from the
//! message alone.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors raised by pipeline stages.
#[derive(Debug, Error)]
pub enum RepackError {
    /// An external command exited non-zero or could not be spawned.
    #[error("command failed (exit code {code}): {command}{}", format_stderr(.stderr))]
    ExternalCommand {
        command: String,
        code: i32,
        stderr: String,
    },

    /// An expected artifact was missing or ambiguous before a stage needed it.
    #[error("precondition failed: {message}")]
    Precondition { message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepackError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for tool failures, false for everything the pipeline itself detected.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::ExternalCommand { .. })
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

fn format_stderr(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr)
    }
}

pub type Result<T> = std::result::Result<T, RepackError>;
