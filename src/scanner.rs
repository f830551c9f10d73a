//! Line-by-line keyword scanning of a single file
//!
//! A file matches when one of its lines contains the keyword as a contiguous
//! substring. Lines are compared one at a time, so a keyword split across a
//! line break is never reported. Input is consumed in chunks of at most
//! `CHUNK_SIZE` bytes; a line longer than that is checked piecewise, each
//! piece carrying enough of the previous one to catch a match on the seam.
//! The cancellation token is checked before every line and every chunk; a
//! scan that sees it fire stops and reports [`ScanOutcome::Cancelled`].

use std::io;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::error::SearchError;
use crate::models::{MatchMode, ScanOutcome};

/// Most bytes of a line held in memory at once, besides the seam overlap
pub(crate) const CHUNK_SIZE: usize = 64 * 1024;

/// Answers "does this file contain this keyword"
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn contains_word(
        &self,
        path: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, SearchError>;
}

/// Scanner that reads files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FileScanner {
    mode: MatchMode,
}

impl FileScanner {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl Scanner for FileScanner {
    async fn contains_word(
        &self,
        path: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, SearchError> {
        let file = File::open(path).await.map_err(|source| {
            log::warn!("Failed to open {} to search in: {}", path, source);
            SearchError::Io { path: path.to_string(), source }
        })?;

        // The handle closes when the reader drops
        let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
        let needle = self.mode.needle(keyword);

        let outcome = scan_lines(&mut reader, self.mode, &needle, cancel)
            .await
            .map_err(|source| SearchError::Io { path: path.to_string(), source })?;

        match outcome {
            ScanOutcome::Found => log::debug!("Found '{}' in {}", keyword, path),
            ScanOutcome::Cancelled => log::trace!("Scan of {} cancelled", path),
            ScanOutcome::NotFound => {}
        }
        Ok(outcome)
    }
}

/// Scan buffered input line by line for an already-prepared needle
///
/// Each `fill_buf` yields at most the reader's capacity, which bounds how much
/// of a single line is decoded at a time.
pub(crate) async fn scan_lines<R>(
    reader: &mut R,
    mode: MatchMode,
    needle: &str,
    cancel: &CancellationToken,
) -> io::Result<ScanOutcome>
where
    R: AsyncBufRead + Unpin,
{
    // Tail of the current line kept across chunks. Case folding can shrink a
    // character to a quarter of its bytes, plus a split character at the front.
    let overlap = needle.len() * 4 + 4;
    let mut window: Vec<u8> = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return Ok(ScanOutcome::Cancelled);
        }

        let (consumed, line_done) = {
            let chunk = reader.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(ScanOutcome::NotFound);
            }
            match chunk.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    window.extend_from_slice(&chunk[..end]);
                    (end + 1, true)
                }
                None => {
                    window.extend_from_slice(chunk);
                    (chunk.len(), false)
                }
            }
        };
        reader.consume(consumed);

        let segment = if line_done {
            window.strip_suffix(b"\r").unwrap_or(&window[..])
        } else {
            &window[..]
        };
        if mode.line_contains(&String::from_utf8_lossy(segment), needle) {
            return Ok(ScanOutcome::Found);
        }

        if line_done {
            window.clear();
        } else {
            let keep_from = window.len().saturating_sub(overlap);
            window.drain(..keep_from);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;
    use tokio::io::{AsyncRead, ReadBuf};

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    async fn scan(mode: MatchMode, path: &str, keyword: &str) -> Result<ScanOutcome, SearchError> {
        FileScanner::new(mode)
            .contains_word(path, keyword, &CancellationToken::new())
            .await
    }

    async fn scan_in_chunks(mode: MatchMode, data: &[u8], keyword: &str, chunk: usize) -> ScanOutcome {
        let mut reader = BufReader::with_capacity(chunk, data);
        scan_lines(&mut reader, mode, &mode.needle(keyword), &CancellationToken::new())
            .await
            .unwrap()
    }

    /// Serves `data` in 1 KiB reads and fires `token` after the given read
    struct CancellingReader {
        data: Vec<u8>,
        pos: usize,
        reads: usize,
        cancel_after: usize,
        token: CancellationToken,
    }

    impl AsyncRead for CancellingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let n = (this.data.len() - this.pos).min(buf.remaining()).min(1024);
            buf.put_slice(&this.data[this.pos..this.pos + n]);
            this.pos += n;
            this.reads += 1;
            if this.reads == this.cancel_after {
                this.token.cancel();
            }
            Poll::Ready(Ok(()))
        }
    }

    async fn cancel_while_reading(data: Vec<u8>) -> (ScanOutcome, usize, usize) {
        let token = CancellationToken::new();
        let len = data.len();
        let source = CancellingReader { data, pos: 0, reads: 0, cancel_after: 3, token: token.clone() };
        let mut reader = BufReader::with_capacity(1024, source);

        let outcome = scan_lines(&mut reader, MatchMode::IgnoreCase, "needle", &token).await.unwrap();
        (outcome, reader.get_ref().pos, len)
    }

    #[tokio::test]
    async fn test_finds_substring_on_a_line() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.txt", b"first line\nthe quick brown fox\nlast\n");

        assert_eq!(scan(MatchMode::Exact, &path, "quick br").await.unwrap(), ScanOutcome::Found);
        assert_eq!(scan(MatchMode::Exact, &path, "ick").await.unwrap(), ScanOutcome::Found);
        assert_eq!(scan(MatchMode::Exact, &path, "wolf").await.unwrap(), ScanOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_keyword_across_line_break_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "split.txt", b"the key\nword is here\n");

        assert_eq!(scan(MatchMode::Exact, &path, "keyword").await.unwrap(), ScanOutcome::NotFound);
        assert_eq!(scan(MatchMode::IgnoreCase, &path, "keyword").await.unwrap(), ScanOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_case_handling_follows_mode() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "case.txt", b"Hello World\n");

        assert_eq!(scan(MatchMode::Exact, &path, "hello").await.unwrap(), ScanOutcome::NotFound);
        assert_eq!(scan(MatchMode::Exact, &path, "Hello").await.unwrap(), ScanOutcome::Found);
        assert_eq!(scan(MatchMode::IgnoreCase, &path, "hELLO").await.unwrap(), ScanOutcome::Found);
    }

    #[tokio::test]
    async fn test_crlf_and_missing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "crlf.txt", b"alpha\r\nbeta");

        assert_eq!(scan(MatchMode::Exact, &path, "alpha").await.unwrap(), ScanOutcome::Found);
        assert_eq!(scan(MatchMode::Exact, &path, "beta").await.unwrap(), ScanOutcome::Found);
        assert_eq!(scan(MatchMode::Exact, &path, "\r").await.unwrap(), ScanOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_non_utf8_content_is_scanned() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bin.dat", b"\xff\xfe garbage\nneedle here\n");

        assert_eq!(scan(MatchMode::Exact, &path, "needle").await.unwrap(), ScanOutcome::Found);
    }

    #[tokio::test]
    async fn test_empty_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.txt", b"");

        assert_eq!(scan(MatchMode::Exact, &path, "x").await.unwrap(), ScanOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_match_at_end_of_line_longer_than_a_chunk() {
        let dir = TempDir::new().unwrap();
        let mut content = vec![b'x'; CHUNK_SIZE * 3 + 17];
        content.extend_from_slice(b"Needle");
        let path = write_file(&dir, "oneline.txt", &content);

        assert_eq!(scan(MatchMode::IgnoreCase, &path, "needle").await.unwrap(), ScanOutcome::Found);
        assert_eq!(scan(MatchMode::Exact, &path, "needle").await.unwrap(), ScanOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_keyword_straddling_chunk_seam_is_found() {
        let data = b"xxxxxxxxxxxxxxneedlexxxx";

        for chunk in [1, 3, 4, 7] {
            assert_eq!(scan_in_chunks(MatchMode::Exact, data, "needle", chunk).await, ScanOutcome::Found);
            assert_eq!(scan_in_chunks(MatchMode::IgnoreCase, data, "NEEDLE", chunk).await, ScanOutcome::Found);
        }
    }

    #[tokio::test]
    async fn test_multibyte_keyword_straddling_chunk_seam_is_found() {
        let data = format!("{}ÉCOLE{}", "à".repeat(40), "ü".repeat(5));

        for chunk in [1, 3, 5] {
            let outcome = scan_in_chunks(MatchMode::IgnoreCase, data.as_bytes(), "école", chunk).await;
            assert_eq!(outcome, ScanOutcome::Found);
        }
    }

    #[tokio::test]
    async fn test_small_chunks_keep_line_boundaries() {
        let data = b"the key\nword is here\r\nalpha";

        for chunk in [1, 2, 4] {
            assert_eq!(scan_in_chunks(MatchMode::Exact, data, "keyword", chunk).await, ScanOutcome::NotFound);
            assert_eq!(scan_in_chunks(MatchMode::Exact, data, "here", chunk).await, ScanOutcome::Found);
            assert_eq!(scan_in_chunks(MatchMode::Exact, data, "alpha", chunk).await, ScanOutcome::Found);
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_inside_a_single_long_line() {
        let (outcome, read, len) = cancel_while_reading(vec![b'x'; 4 * 1024 * 1024]).await;

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert_eq!(read, 3 * 1024);
        assert!(read < len);
    }

    #[tokio::test]
    async fn test_cancel_stops_between_lines() {
        let (outcome, read, len) = cancel_while_reading(b"hay stack\n".repeat(100_000)).await;

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert!(read < len);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error_with_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.txt").to_string_lossy().into_owned();

        match scan(MatchMode::Exact, &path, "x").await {
            Err(SearchError::Io { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_reading() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.txt", b"needle\n");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = FileScanner::new(MatchMode::Exact)
            .contains_word(&path, "needle", &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_token_still_reports_open_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.txt").to_string_lossy().into_owned();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = FileScanner::new(MatchMode::Exact)
            .contains_word(&path, "needle", &cancel)
            .await;
        assert!(matches!(result, Err(SearchError::Io { .. })));
    }
}
