//! Utilities for build history directories and generated-file writes.

use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::lib::errors::HistoryError;

/// File write status for `write_generated_file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedFileStatus {
    Planned,
    Written,
    SkippedExisting,
}

/// Result summary for a generated-file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFileResult {
    pub status: GeneratedFileStatus,
    pub path: PathBuf,
}

/// Write a generated file such as `webpack.config.js` to disk.
///
/// In dry-run mode this function does not mutate filesystem state.
/// Without `force`, an existing file is preserved and no write happens.
pub fn write_generated_file(
    path: &Path,
    content: &str,
    force: bool,
    dry_run: bool,
) -> Result<GeneratedFileResult, io::Error> {
    if path.exists() && !force {
        return Ok(GeneratedFileResult {
            status: GeneratedFileStatus::SkippedExisting,
            path: path.to_path_buf(),
        });
    }

    if dry_run {
        return Ok(GeneratedFileResult {
            status: GeneratedFileStatus::Planned,
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content.as_bytes())?;

    Ok(GeneratedFileResult {
        status: GeneratedFileStatus::Written,
        path: path.to_path_buf(),
    })
}

/// Ensure the job log directory under the history root exists.
pub fn ensure_history_dir(base_dir: &Path) -> Result<PathBuf, HistoryError> {
    fs::create_dir_all(base_dir).map_err(|source| HistoryError::CreateDir {
        path: base_dir.to_path_buf(),
        source,
    })?;
    Ok(base_dir.to_path_buf())
}

/// Path of the full build log for a job.
pub fn job_log_path(base_dir: &Path, job_id: &Uuid) -> PathBuf {
    base_dir.join(format!("{job_id}.log"))
}

/// Delete history entries whose TTL has expired and return the removed paths.
pub fn cleanup_expired_entries(
    root: &Path,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>, HistoryError> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    for entry in fs::read_dir(root).map_err(|source| HistoryError::ReadDir {
        path: root.to_path_buf(),
        source,
    })? {
        let entry = entry.map_err(|source| HistoryError::ReadDir {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let metadata = entry.metadata().map_err(|source| HistoryError::Io {
            path: path.clone(),
            source,
        })?;
        let modified = metadata.modified().map_err(|source| HistoryError::Io {
            path: path.clone(),
            source,
        })?;
        let modified = DateTime::<Utc>::from(modified);
        if now - modified > ttl {
            if path.is_dir() {
                fs::remove_dir_all(&path).map_err(|source| HistoryError::Cleanup {
                    path: path.clone(),
                    source,
                })?;
            } else {
                fs::remove_file(&path).map_err(|source| HistoryError::Cleanup {
                    path: path.clone(),
                    source,
                })?;
            }
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Return the SHA256 of any file as a hex string.
pub fn compute_sha256(path: &Path) -> Result<String, HistoryError> {
    let mut file = File::open(path).map_err(|source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer).map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Return the size of a file in bytes.
pub fn file_size(path: &Path) -> Result<u64, HistoryError> {
    let metadata = fs::metadata(path).map_err(|source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(metadata.len())
}
