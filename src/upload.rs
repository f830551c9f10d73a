//! Persisting uploaded files under collision-free names
//!
//! An upload named `notes.txt` is written to `<dir>/notes.txt`; if that name is
//! taken it becomes `<dir>/1_notes.txt`, then `<dir>/2_notes.txt`, and so on.
//! Files are created with `create_new`, so two concurrent uploads of the same
//! name never overwrite each other.

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Give up after this many taken names
const MAX_NAME_ATTEMPTS: usize = 10_000;

/// Write `bytes` into `dir` and return the path it was saved under
pub async fn save_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let file_name = sanitize_file_name(file_name)?;

    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = dir.join(candidate_name(&file_name, attempt));

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&candidate).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create destination file {}", candidate.display()));
            }
        };

        file.write_all(bytes)
            .await
            .with_context(|| format!("Failed to write {}", candidate.display()))?;
        file.flush()
            .await
            .with_context(|| format!("Failed to flush {}", candidate.display()))?;

        log::info!("Saved upload {} ({} bytes)", candidate.display(), bytes.len());
        return Ok(candidate);
    }

    anyhow::bail!("No free name for upload '{}' in {}", file_name, dir.display())
}

fn candidate_name(file_name: &str, attempt: usize) -> String {
    if attempt == 0 {
        file_name.to_string()
    } else {
        format!("{}_{}", attempt, file_name)
    }
}

/// Keep only the final path component of a client-supplied name
///
/// Fails for names with no usable final component, such as `""`, `..` or `/`.
pub fn sanitize_file_name(file_name: &str) -> Result<String> {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .with_context(|| format!("Invalid upload file name '{}'", file_name))?;

    Ok(name.to_string())
}
