//! Error types for the search core
//!
//! The outer layers (CLI, config, upload, HTTP wiring) use `anyhow`. The core
//! returns [`SearchError`] so callers can tell a precondition failure from a
//! per-file read failure and map them to their own responses.

use std::io;

use thiserror::Error;

/// Errors produced by searching and indexing
#[derive(Debug, Error)]
pub enum SearchError {
    /// The registry was empty when a search started
    #[error("no files available for search")]
    NoFilesAvailable,

    /// The keyword was empty
    #[error("keyword is required")]
    EmptyKeyword,

    /// A single file could not be opened or read during a scan
    #[error("error in file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A file could not be read while building its word set
    #[error("failed to index {path}: {source}")]
    IndexRead {
        path: String,
        #[source]
        source: io::Error,
    },

    /// One or more files failed during a fan-out scan
    #[error("{} file(s) failed during search: {}", .0.len(), join_errors(.0))]
    ScanAggregate(Vec<SearchError>),

    /// The caller cancelled the search before it finished
    #[error("search cancelled")]
    Cancelled,

    /// A scan task panicked or was aborted by the runtime
    #[error("scan task failed: {0}")]
    TaskFailed(String),
}

impl SearchError {
    /// File paths named by this error (recursing into aggregates)
    pub fn failed_paths(&self) -> Vec<&str> {
        match self {
            SearchError::Io { path, .. } | SearchError::IndexRead { path, .. } => vec![path.as_str()],
            SearchError::ScanAggregate(errors) => {
                errors.iter().flat_map(|e| e.failed_paths()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn join_errors(errors: &[SearchError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
