//! Core data models shared by the engine, the HTTP API and the CLI

use serde::{Deserialize, Serialize};

/// Case policy shared by index lookups and live scans
///
/// `IgnoreCase` folds the keyword before the index lookup and folds each
/// scanned line, so a cache hit and a live scan agree on case. `Exact` looks
/// the raw keyword up in the (lowercase) index and scans case-sensitively.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    IgnoreCase,
    Exact,
}

impl MatchMode {
    /// Key under which a keyword is looked up in and committed to the index
    pub fn index_key(self, keyword: &str) -> String {
        match self {
            MatchMode::IgnoreCase => keyword.to_lowercase(),
            MatchMode::Exact => keyword.to_string(),
        }
    }

    /// Form of the keyword compared against each scanned line
    pub fn needle(self, keyword: &str) -> String {
        self.index_key(keyword)
    }

    /// Whether a single line contains an already-prepared needle
    pub fn line_contains(self, line: &str, needle: &str) -> bool {
        match self {
            MatchMode::IgnoreCase => line.to_lowercase().contains(needle),
            MatchMode::Exact => line.contains(needle),
        }
    }
}

/// Result of scanning one file for a keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Some line contains the keyword
    Found,
    /// The whole file was read without a match
    NotFound,
    /// Cancellation was observed before the file was fully read
    Cancelled,
}

/// Body returned by `GET /files` and `GET /search`
///
/// `files` serializes as `null` when a search matched nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilesResponse {
    pub files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FilesResponse {
    pub fn files(files: Vec<String>) -> Self {
        Self { files: Some(files), error: None }
    }

    pub fn matches(files: Vec<String>) -> Self {
        if files.is_empty() {
            Self { files: None, error: None }
        } else {
            Self::files(files)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { files: None, error: Some(message.into()) }
    }
}

/// Body returned by a successful `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Path the upload was saved under (also its registry identifier)
    pub path: String,
}

/// Registry and index sizes reported by `GET /stats`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageStats {
    pub registered_files: usize,
    pub indexed_words: usize,
}
