use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::lib::errors::HistoryError;
use crate::lib::fs as history_fs;

pub const HISTORY_ROOT: &str = "target/webpack-sidecar-jobs";
const HISTORY_FALLBACK_ROOT: &str = "webpack-sidecar/jobs";

/// Build job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildJobStatus {
    Succeeded,
    Failed,
}

/// Record of a one-shot build job.
#[derive(Debug, Clone)]
pub struct BuildJobRecord {
    pub job_id: Uuid,
    pub status: BuildJobStatus,
    pub bundle_path: Option<PathBuf>,
    pub bundle_sha256: Option<String>,
    pub bundle_size: Option<u64>,
    pub log_excerpt: String,
    pub finished_at: DateTime<Utc>,
}

/// Store that keeps job outcomes, persists their logs, and enforces TTL.
#[derive(Clone, Debug)]
pub struct BuildHistory {
    inner: Arc<BuildHistoryInner>,
}

#[derive(Debug)]
struct BuildHistoryInner {
    root: PathBuf,
    ttl: Duration,
    cleanup_interval: Duration,
    state: Mutex<HistoryState>,
}

#[derive(Debug)]
struct HistoryState {
    jobs: HashMap<Uuid, BuildJobRecord>,
    last_cleanup: Option<DateTime<Utc>>,
}

impl BuildHistory {
    /// Build a history store using the default job directory.
    pub fn new(ttl_secs: u32, cleanup_schedule_secs: u32) -> Self {
        let root = resolve_history_root();
        Self::with_root(root, ttl_secs, cleanup_schedule_secs)
    }

    /// Build a history store with a custom root directory (useful for tests).
    pub fn with_root(root: PathBuf, ttl_secs: u32, cleanup_schedule_secs: u32) -> Self {
        Self {
            inner: Arc::new(BuildHistoryInner {
                root,
                ttl: Duration::seconds(ttl_secs as i64),
                cleanup_interval: Duration::seconds(cleanup_schedule_secs as i64),
                state: Mutex::new(HistoryState {
                    jobs: HashMap::new(),
                    last_cleanup: None,
                }),
            }),
        }
    }

    /// Return the job directory currently used by this store.
    pub fn root_dir(&self) -> PathBuf {
        self.inner.root.clone()
    }

    /// Record a successful job and persist its full log.
    pub async fn record_success(
        &self,
        job_id: Uuid,
        bundle_path: PathBuf,
        bundle_sha256: String,
        bundle_size: u64,
        log_excerpt: String,
        finished_at: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.maybe_cleanup(finished_at).await;
        self.persist_log(&job_id, &log_excerpt)?;
        let mut state = self.inner.state.lock().await;
        state.jobs.insert(
            job_id,
            BuildJobRecord {
                job_id,
                status: BuildJobStatus::Succeeded,
                bundle_path: Some(bundle_path),
                bundle_sha256: Some(bundle_sha256),
                bundle_size: Some(bundle_size),
                log_excerpt,
                finished_at,
            },
        );
        Ok(())
    }

    /// Record a failed job and persist its full log.
    pub async fn record_failure(
        &self,
        job_id: Uuid,
        log_excerpt: String,
        finished_at: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        self.maybe_cleanup(finished_at).await;
        self.persist_log(&job_id, &log_excerpt)?;
        let mut state = self.inner.state.lock().await;
        state.jobs.insert(
            job_id,
            BuildJobRecord {
                job_id,
                status: BuildJobStatus::Failed,
                bundle_path: None,
                bundle_sha256: None,
                bundle_size: None,
                log_excerpt,
                finished_at,
            },
        );
        Ok(())
    }

    pub(crate) async fn fetch_record(
        &self,
        job_id: &Uuid,
    ) -> Result<BuildJobRecord, crate::bundler::history::JobLookupError> {
        let now = Utc::now();
        self.maybe_cleanup(now).await;
        let mut state = self.inner.state.lock().await;
        let record = state.jobs.get(job_id).cloned().ok_or(
            crate::bundler::history::JobLookupError::JobNotFound { job_id: *job_id },
        )?;
        if now - record.finished_at > self.inner.ttl {
            state.jobs.remove(job_id);
            return Err(crate::bundler::history::JobLookupError::JobExpired { job_id: *job_id });
        }
        Ok(record)
    }

    pub(crate) fn ttl_seconds_remaining(&self, record: &BuildJobRecord) -> u32 {
        let now = Utc::now();
        let expires_at = record.finished_at + self.inner.ttl;
        if expires_at <= now {
            return 0;
        }
        let remaining = expires_at - now;
        remaining.num_seconds().try_into().unwrap_or(0)
    }

    fn persist_log(&self, job_id: &Uuid, log: &str) -> Result<(), HistoryError> {
        let root = history_fs::ensure_history_dir(&self.inner.root)?;
        let log_path = history_fs::job_log_path(&root, job_id);
        fs::write(&log_path, log).map_err(|source| HistoryError::Io {
            path: log_path,
            source,
        })
    }

    async fn maybe_cleanup(&self, now: DateTime<Utc>) {
        let should_cleanup = {
            let mut state = self.inner.state.lock().await;
            let should = state
                .last_cleanup
                .map(|last| now - last >= self.inner.cleanup_interval)
                .unwrap_or(true);
            if should {
                state.last_cleanup = Some(now);
            }
            should
        };

        if !should_cleanup {
            return;
        }

        if let Err(err) =
            history_fs::cleanup_expired_entries(&self.inner.root, self.inner.ttl, now)
        {
            warn!(
                target: "webpack_sidecar::bundler",
                error = %err,
                root = %self.inner.root.display(),
                "Failed to clean job history directory"
            );
        }

        let metadata_window = self.inner.ttl + self.inner.cleanup_interval;
        let mut state = self.inner.state.lock().await;
        state
            .jobs
            .retain(|_, record| now - record.finished_at <= metadata_window);
    }
}

fn resolve_history_root() -> PathBuf {
    let preferred = PathBuf::from(HISTORY_ROOT);
    let fallback = std::env::temp_dir().join(HISTORY_FALLBACK_ROOT);
    resolve_history_root_with(&preferred, &fallback)
}

fn resolve_history_root_with(preferred: &Path, fallback: &Path) -> PathBuf {
    if directory_writable(preferred) {
        return preferred.to_path_buf();
    }

    if directory_writable(fallback) {
        warn!(
            target: "webpack_sidecar::bundler",
            preferred_root = %preferred.display(),
            fallback_root = %fallback.display(),
            "Job history root is not writable; using temporary directory fallback"
        );
        return fallback.to_path_buf();
    }

    warn!(
        target: "webpack_sidecar::bundler",
        preferred_root = %preferred.display(),
        fallback_root = %fallback.display(),
        "Job history root and fallback are not writable; keeping preferred root"
    );
    preferred.to_path_buf()
}

fn directory_writable(path: &Path) -> bool {
    if fs::create_dir_all(path).is_err() {
        return false;
    }

    let probe = path.join(format!(
        ".webpack-sidecar-write-probe-{}-{}",
        std::process::id(),
        Uuid::new_v4()
    ));
    match OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
