//! Lookup of stored build jobs and their bundles.
pub mod store;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::lib::errors::{FailureDescriptor, HistoryError};

pub use store::{BuildHistory, BuildJobRecord, BuildJobStatus, HISTORY_ROOT};

/// Input for a job lookup.
#[derive(Debug, Deserialize)]
pub struct JobLookupRequest {
    pub job_id: String,
    #[serde(default = "default_include_logs")]
    pub include_logs: bool,
}

fn default_include_logs() -> bool {
    true
}

/// Response describing a stored build job.
#[derive(Debug, Serialize)]
pub struct JobReport {
    pub job_id: String,
    pub status: &'static str,
    pub bundle_path: Option<String>,
    pub bundle_sha256: Option<String>,
    pub bundle_size: Option<u64>,
    pub ttl_seconds: u32,
    pub log_excerpt: Option<String>,
}

/// Error types for job lookup.
#[derive(Debug, Error)]
pub enum JobLookupError {
    #[error("Invalid job ID format: {raw}")]
    InvalidJobId { raw: String },
    #[error("Job {job_id} not found")]
    JobNotFound { job_id: Uuid },
    #[error("Job {job_id} has expired")]
    JobExpired { job_id: Uuid },
    #[error("Job {job_id} did not produce a bundle because the build failed")]
    BuildFailedNoBundle { job_id: Uuid },
    #[error(transparent)]
    Store(#[from] HistoryError),
}

/// Core logic for the job lookup surface.
pub async fn lookup_job(
    history: &BuildHistory,
    request: JobLookupRequest,
) -> Result<JobReport, JobLookupError> {
    let job_id = Uuid::parse_str(request.job_id.trim()).map_err(|_| {
        JobLookupError::InvalidJobId {
            raw: request.job_id.clone(),
        }
    })?;
    let record = history.fetch_record(&job_id).await?;
    match record.status {
        BuildJobStatus::Succeeded => {
            let ttl = history.ttl_seconds_remaining(&record);
            Ok(JobReport {
                job_id: job_id.to_string(),
                status: "succeeded",
                bundle_path: record
                    .bundle_path
                    .as_ref()
                    .map(|path| path.to_string_lossy().to_string()),
                bundle_sha256: record.bundle_sha256.clone(),
                bundle_size: record.bundle_size,
                ttl_seconds: ttl,
                log_excerpt: request.include_logs.then(|| record.log_excerpt.clone()),
            })
        }
        BuildJobStatus::Failed => Err(JobLookupError::BuildFailedNoBundle { job_id }),
    }
}

/// Convert lookup errors into a structured failure report.
pub fn lookup_error_to_report(err: JobLookupError) -> serde_json::Value {
    match err {
        JobLookupError::InvalidJobId { raw } => {
            lookup_report(&INVALID_JOB_ID_FAILURE, None, json!({ "raw": raw }), false)
        }
        JobLookupError::JobNotFound { job_id } => {
            lookup_report(&JOB_NOT_FOUND_FAILURE, Some(job_id), json!({}), false)
        }
        JobLookupError::JobExpired { job_id } => {
            lookup_report(&JOB_EXPIRED_FAILURE, Some(job_id), json!({}), true)
        }
        JobLookupError::BuildFailedNoBundle { job_id } => {
            lookup_report(&BUILD_FAILED_FAILURE, Some(job_id), json!({}), false)
        }
        JobLookupError::Store(err) => lookup_report(
            &STORE_FAILURE,
            None,
            json!({ "reason": err.to_string() }),
            true,
        ),
    }
}

const INVALID_JOB_ID_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "invalid_job_id",
    "Invalid job_id format",
    "Provide a UUID-formatted job_id and run the request again.",
);

const JOB_NOT_FOUND_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "job_not_found",
    "The requested build job was not found",
    "Check the job_id or run a new build.",
);

const JOB_EXPIRED_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "job_expired",
    "The job record TTL has expired",
    "Run a new build to produce a fresh bundle and job record.",
);

const BUILD_FAILED_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "build_failed_no_bundle",
    "No bundle is available because the build failed",
    "Review the logs, fix the issue, and build again.",
);

const STORE_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "history_failure",
    "Failed to read the build job record",
    "Check permissions on the job history directory.",
);

fn lookup_report(
    descriptor: &'static FailureDescriptor,
    job_id: Option<Uuid>,
    details: serde_json::Value,
    retryable: bool,
) -> serde_json::Value {
    let mut builder = descriptor.builder().details(details).retryable(retryable);

    if let Some(job) = job_id {
        builder = builder.with_context_field("job_id", json!(job.to_string()));
    }

    builder.build().expect("descriptor is valid")
}
