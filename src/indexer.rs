//! Builds inverted-index entries from whole files
//!
//! The indexer reads a file in bounded chunks, splits the text on whitespace,
//! lowercases the tokens and collects them into a per-file set. A token cut by
//! a chunk boundary is carried into the next chunk; a run of more than
//! `MAX_TOKEN_LEN` bytes without whitespace fails the file. Only after the
//! whole file was read is the set merged into the index, in one locked
//! operation. A read failure discards the set.

use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::error::SearchError;
use crate::scanner::CHUNK_SIZE;
use crate::storage::Storage;

/// Longest run of non-whitespace bytes accepted as a single token
pub(crate) const MAX_TOKEN_LEN: usize = 64 * 1024;

/// Split a line into lowercase whitespace-separated tokens
pub fn tokenize(line: &str) -> impl Iterator<Item = String> + '_ {
    line.split_whitespace().map(str::to_lowercase)
}

/// Merges file word sets into the shared index
#[derive(Debug, Clone)]
pub struct Indexer {
    storage: Arc<Storage>,
}

impl Indexer {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Index one file, returning the number of distinct words merged
    pub async fn index_file(&self, path: &str) -> Result<usize, SearchError> {
        let start = Instant::now();
        let words = read_words(path).await?;
        let count = words.len();

        self.storage.index().merge_file(path, words);

        log::info!(
            "Indexed {} ({} distinct words) in {:.1}ms",
            path,
            count,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(count)
    }
}

async fn read_words(path: &str) -> Result<HashSet<String>, SearchError> {
    let index_error = |source| SearchError::IndexRead { path: path.to_string(), source };

    let file = File::open(path).await.map_err(index_error)?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    collect_words(&mut reader).await.map_err(index_error)
}

/// Tokenize buffered input without holding more than one chunk plus one
/// partial token
pub(crate) async fn collect_words<R>(reader: &mut R) -> io::Result<HashSet<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut words = HashSet::new();
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let consumed = {
            let chunk = reader.fill_buf().await?;
            if chunk.is_empty() {
                break;
            }
            pending.extend_from_slice(chunk);
            chunk.len()
        };
        reader.consume(consumed);

        // An ASCII whitespace byte never sits inside a UTF-8 sequence, so
        // everything up to it decodes as whole tokens
        if let Some(cut) = pending.iter().rposition(|b| b.is_ascii_whitespace()) {
            let rest = pending.split_off(cut + 1);
            add_tokens(&mut words, &pending);
            pending = rest;
        }

        if pending.len() > MAX_TOKEN_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("token longer than {} bytes", MAX_TOKEN_LEN),
            ));
        }
    }

    add_tokens(&mut words, &pending);
    Ok(words)
}

fn add_tokens(words: &mut HashSet<String>, bytes: &[u8]) {
    words.extend(tokenize(&String::from_utf8_lossy(bytes)));
}
