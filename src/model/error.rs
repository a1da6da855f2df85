//! Error types for repotui.
//!
//! This module defines the error taxonomy using `thiserror` for structured error handling.
//! Errors compose via `?` and `From` conversions.
//!
//! # Error Hierarchy
//!
//! - [`AppError`] - Top-level error returned by the event loop and `main`
//!   - [`RepoError`] - Repository lookups that failed (unknown name, missing path, ...)
//!   - [`WorkerError`] - Background producer failures (spawn, panic, lost channel)
//!   - `std::io::Error` - Terminal failures
//! - [`Cancelled`] - A user-requested stop; not a failure
//! - [`AnnotateError`] - What the annotate routine reports: cancelled or a repository error
//!
//! # Recovery Strategy
//!
//! Repository errors are **recoverable**: the current command is aborted and the message is
//! shown on the status line. Worker and terminal errors are **fatal**: the event loop closes
//! every view and returns the error to `main`, which exits non-zero.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::model::identifiers::InvalidArtifactId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error encompassing all failure modes.
#[derive(Debug, Error)]
pub enum AppError {
    /// A repository operation failed.
    ///
    /// **Recovery**: show on the status line, keep running.
    #[error("{0}")]
    Repo(#[from] RepoError),

    /// A background producer failed.
    ///
    /// **Recovery**: none - tear down all views and exit.
    #[error("worker failure: {0}")]
    Worker(#[from] WorkerError),

    /// Terminal or TUI rendering error.
    ///
    /// This indicates failures in the crossterm/ratatui layer, such as broken pipes or I/O
    /// errors during rendering. Without a working terminal the TUI cannot function.
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be initialized.
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
}

impl AppError {
    /// Whether the event loop must stop because of this error.
    ///
    /// Repository errors abort only the command that caused them.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::Repo(_))
    }
}

/// Errors reported by the repository engine.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A symbolic name (branch, tag, id prefix) did not resolve.
    ///
    /// **When this occurs**: the user mistyped a commit on the command line or a
    /// branch tip vanished.
    #[error("unknown commit or symbolic name: {name}")]
    UnknownName {
        /// The name as given.
        name: String,
    },

    /// An id prefix matched more than one artifact.
    #[error("ambiguous id prefix: {prefix}")]
    Ambiguous {
        /// The prefix as given.
        prefix: String,
    },

    /// An artifact referenced by another one is missing.
    #[error("missing artifact {id}")]
    MissingArtifact {
        /// Id that could not be loaded.
        id: String,
    },

    /// A path is not present in the tree of the given commit.
    #[error("{path}: no such file or directory in commit {commit}")]
    PathNotFound {
        /// Requested path.
        path: String,
        /// Commit that was searched.
        commit: String,
    },

    /// The artifact exists but is of the wrong kind for the operation.
    #[error("{id} is not a {expected}")]
    WrongKind {
        /// Artifact id.
        id: String,
        /// Kind the operation needed.
        expected: &'static str,
    },

    /// A local-changes operation was requested without a checkout.
    #[error("no local checkout")]
    NoCheckout,

    /// Snapshot file could not be parsed.
    #[error("invalid repository snapshot {path:?}: {reason}")]
    Snapshot {
        /// Snapshot location.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// Stored data violates an invariant (bad id, cycle, ...).
    #[error("corrupt repository data: {0}")]
    Corrupt(String),

    /// I/O error reading repository data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InvalidArtifactId> for RepoError {
    fn from(err: InvalidArtifactId) -> Self {
        RepoError::Corrupt(err.to_string())
    }
}

/// Failures of a background producer thread.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The OS refused to start the thread.
    #[error("failed to spawn {worker} thread: {source}")]
    Spawn {
        /// Worker name.
        worker: &'static str,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The thread panicked; the panic is reported at join.
    #[error("{worker} thread panicked")]
    Panicked {
        /// Worker name.
        worker: &'static str,
    },
}

/// A user-requested stop of a running operation.
///
/// Distinct from an error: the operation unwinds cleanly and nothing is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Outcome of a failed annotate run.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// The per-line callback asked to stop.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// The repository failed while walking history.
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_errors_are_recoverable() {
        let err: AppError = RepoError::UnknownName {
            name: "trnk".into(),
        }
        .into();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("trnk"));
    }

    #[test]
    fn worker_and_terminal_errors_are_fatal() {
        let worker: AppError = WorkerError::Panicked { worker: "history" }.into();
        assert!(worker.is_fatal());
        let io: AppError = std::io::Error::other("gone").into();
        assert!(io.is_fatal());
    }

    #[test]
    fn path_not_found_names_path_and_commit() {
        let msg = RepoError::PathNotFound {
            path: "src/lib.rs".into(),
            commit: "abc123".into(),
        }
        .to_string();
        assert!(msg.contains("src/lib.rs"));
        assert!(msg.contains("abc123"));
    }

    #[test]
    fn cancelled_converts_into_annotate_error() {
        let err: AnnotateError = Cancelled.into();
        assert!(matches!(err, AnnotateError::Cancelled(_)));
    }
}
