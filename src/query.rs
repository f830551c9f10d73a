//! Query engine: keyword search over the registered files
//!
//! A search first asks the inverted index. On a hit the cached file list is
//! returned without touching disk. On a miss every registered file is scanned
//! concurrently, one task per file:
//!
//! 1. Snapshot the registry (empty registry = [`SearchError::NoFilesAvailable`])
//! 2. Look the keyword up in the index; return a non-empty entry as-is
//! 3. Spawn a scan task per file, all sharing one cancellation token
//! 4. The first match or the first error cancels the token
//! 5. Join every task, collecting matches and errors
//! 6. Any error fails the whole search and nothing is cached
//! 7. Otherwise cache a non-empty match set and return it
//!
//! Because first-match-wins cancels the other scans, a cached entry holds the
//! files that matched before cancellation took effect, not every file that
//! contains the keyword.
//!
//! Each scan opens its file before it first checks the token, so an
//! unreadable file always reports its error and an error is never hidden by a
//! concurrent match.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::indexer::Indexer;
use crate::models::ScanOutcome;
use crate::scanner::{FileScanner, Scanner};
use crate::storage::Storage;

/// Searches the files registered in a [`Storage`]
#[derive(Clone)]
pub struct QueryEngine {
    storage: Arc<Storage>,
    scanner: Arc<dyn Scanner>,
    config: SearchConfig,
}

impl QueryEngine {
    /// Create an engine that scans the local filesystem
    pub fn new(storage: Arc<Storage>, config: SearchConfig) -> Self {
        let scanner = Arc::new(FileScanner::new(config.match_mode));
        Self::with_scanner(storage, config, scanner)
    }

    /// Create an engine with a custom scanner
    pub fn with_scanner(storage: Arc<Storage>, config: SearchConfig, scanner: Arc<dyn Scanner>) -> Self {
        Self { storage, scanner, config }
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Register a file that already exists on disk
    pub fn register_file(&self, path: impl Into<String>) {
        self.storage.register_file(path);
    }

    /// Tokenize a registered file into the index
    pub async fn index_file(&self, path: &str) -> Result<usize, SearchError> {
        Indexer::new(Arc::clone(&self.storage)).index_file(path).await
    }

    /// Find the files containing `keyword`
    pub async fn search(&self, keyword: &str) -> Result<Vec<String>, SearchError> {
        self.search_with_cancel(keyword, &CancellationToken::new()).await
    }

    /// Find the files containing `keyword`, stopping early if `cancel` fires
    ///
    /// Cancelling `cancel` stops every in-flight scan at its next line and the
    /// search returns [`SearchError::Cancelled`] without caching anything.
    pub async fn search_with_cancel(
        &self,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, SearchError> {
        if keyword.is_empty() {
            return Err(SearchError::EmptyKeyword);
        }

        let files = self.storage.registry().snapshot();
        if files.is_empty() {
            return Err(SearchError::NoFilesAvailable);
        }

        let key = self.config.match_mode.index_key(keyword);
        if let Some(cached) = self.storage.index().lookup(&key) {
            log::debug!("Index hit for '{}': {} file(s)", key, cached.len());
            return Ok(cached);
        }

        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        log::debug!("Index miss for '{}', scanning {} file(s)", key, files.len());
        let start = Instant::now();
        let matches = self.scan_files(files, keyword, cancel).await?;

        log::info!(
            "Scanned for '{}': {} match(es) in {:.1}ms",
            keyword,
            matches.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        if !matches.is_empty() {
            self.storage.index().append_entry(key, matches.clone());
        }

        Ok(matches)
    }

    /// Fan out one scan per file and fold the outcomes
    async fn scan_files(
        &self,
        files: Vec<String>,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, SearchError> {
        let token = cancel.child_token();
        let keyword: Arc<str> = Arc::from(keyword);
        let limiter = match self.config.max_concurrent_scans {
            0 => None,
            permits => Some(Arc::new(Semaphore::new(permits))),
        };

        let mut tasks = JoinSet::new();
        for path in files {
            let scanner = Arc::clone(&self.scanner);
            let keyword = Arc::clone(&keyword);
            let token = token.clone();
            let limiter = limiter.clone();

            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                let outcome = scanner.contains_word(&path, &keyword, &token).await;
                (path, outcome)
            });
        }

        let mut matches = Vec::new();
        let mut errors = Vec::new();

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::debug!("Search for '{}' cancelled by caller", keyword);
                    tasks.abort_all();
                    return Err(SearchError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((path, Ok(ScanOutcome::Found))) => {
                    matches.push(path);
                    token.cancel();
                }
                Ok((_, Ok(ScanOutcome::NotFound))) => {}
                Ok((path, Ok(ScanOutcome::Cancelled))) => {
                    log::trace!("Scan of {} stopped early", path);
                }
                Ok((path, Err(e))) => {
                    log::warn!("Scan of {} failed: {}", path, e);
                    errors.push(e);
                    token.cancel();
                }
                Err(e) => {
                    log::error!("Scan task failed: {}", e);
                    errors.push(SearchError::TaskFailed(e.to_string()));
                    token.cancel();
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        if !errors.is_empty() {
            return Err(SearchError::ScanAggregate(errors));
        }
        Ok(matches)
    }
}
