//! wordscan: concurrent keyword search with a lazily built inverted index
//!
//! wordscan keeps a registry of text files and answers "which files contain
//! this keyword". Answers come from an in-memory inverted index when it knows
//! the word; otherwise every registered file is scanned concurrently and the
//! result is cached for the next query.
//!
//! # Architecture
//!
//! - **Storage**: file registry and inverted index, each behind its own lock
//! - **Scanner**: line-by-line substring scan of one file, cancellable
//! - **Indexer**: tokenizes a whole file and merges its words into the index
//! - **Query Engine**: index lookup, then fan-out scan with first-match-wins
//! - **Server**: HTTP upload / list / search endpoints over the engine
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use wordscan::{QueryEngine, SearchConfig, Storage};
//!
//! # async fn run() -> Result<(), wordscan::SearchError> {
//! let storage = Arc::new(Storage::new());
//! let engine = QueryEngine::new(storage, SearchConfig::default());
//!
//! engine.register_file("notes.txt");
//! engine.index_file("notes.txt").await?;
//! let files = engine.search("meeting").await?;
//!
//! println!("Found in {} file(s)", files.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod indexer;
pub mod models;
pub mod output;
pub mod query;
pub mod scanner;
pub mod server;
pub mod storage;
pub mod upload;

// Re-export commonly used types
pub use config::{Config, SearchConfig, ServerConfig};
pub use error::SearchError;
pub use indexer::Indexer;
pub use models::{MatchMode, ScanOutcome};
pub use query::QueryEngine;
pub use scanner::{FileScanner, Scanner};
pub use storage::{FileRegistry, InvertedIndex, Storage};
