use std::{
    env,
    path::Path,
    time::{Duration, Instant},
};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::time;
use tracing::info;
use uuid::Uuid;

use crate::{
    bundler::record::{Mode, WebpackConfig},
    lib::{
        errors::{FailureDescriptor, WebpackBuildError},
        fs as history_fs,
        telemetry::JobSpan,
        webpack as webpack_helpers,
    },
    server::config::SidecarConfig,
};

use super::{BuildRequestValidationError, BundleBuildRequest};

const LOG_EXCERPT_LIMIT: usize = 5_000;

const INVALID_INPUT_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "invalid_request",
    "The bundle build request format is invalid",
    "Check the constraints for mode, extra_args, and env_overrides.",
);
const TIMEOUT_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "timeout",
    "Build was aborted after exceeding max_build_minutes",
    "Shorten the build or increase build.max_build_minutes in sidecar.toml.",
);
const BUILD_FAILED_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "build_failed",
    "webpack exited with an error",
    "Review the log excerpt and fix the failing modules.",
);
const ENTRY_MISSING_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "entry_missing",
    "The configured entry point does not exist",
    "Create the entry file or update bundle.entry in sidecar.toml.",
);
const BUNDLE_MISSING_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "bundle_missing",
    "webpack succeeded but the expected bundle was not emitted",
    "Align bundle.filename in sidecar.toml with the webpack output settings.",
);
const HISTORY_FAILURE: FailureDescriptor = FailureDescriptor::new(
    "history_failure",
    "Failed to record the build outcome",
    "Check permissions on the job history directory.",
);

/// Response from a one-shot bundle build.
#[derive(Debug, Serialize)]
pub struct BundleBuildResponse {
    pub job_id: String,
    pub status: &'static str,
    pub bundle_path: String,
    pub bundle_size: u64,
    pub bundle_sha256: String,
    pub log_excerpt: String,
    pub duration_ms: u128,
}

/// Execute a one-shot webpack build and stat the emitted bundle.
pub async fn run_build(
    request: &BundleBuildRequest,
    record: &WebpackConfig,
    config: &SidecarConfig,
    project_root: &Path,
    job_id: Uuid,
) -> Result<BundleBuildResponse, WebpackBuildError> {
    let span = JobSpan::start(job_id, "bundle_build");
    let result = execute_build(request, record, config, project_root, job_id).await;
    match &result {
        Ok(_) => span.finish("succeeded", Some(0)),
        Err(WebpackBuildError::CommandFailed { exit_code, .. }) => {
            span.finish("failed", *exit_code)
        }
        Err(_) => span.finish("failed", None),
    }
    result
}

async fn execute_build(
    request: &BundleBuildRequest,
    record: &WebpackConfig,
    config: &SidecarConfig,
    project_root: &Path,
    job_id: Uuid,
) -> Result<BundleBuildResponse, WebpackBuildError> {
    let entry_path = project_root.join(&record.entry);
    if !entry_path.is_file() {
        return Err(WebpackBuildError::EntryMissing { path: entry_path });
    }

    let time_scale = env::var("SIDECAR_TEST_TIME_SCALE")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|scale| *scale > 0)
        .unwrap_or(60);
    let timeout_duration =
        Duration::from_secs(u64::from(config.build.max_build_minutes) * time_scale);
    let start = Instant::now();
    let mode = request.effective_mode(record.mode);
    let output = time::timeout(
        timeout_duration,
        spawn_webpack(request, config, project_root, mode),
    )
    .await
    .map_err(|_| WebpackBuildError::Timeout {
        duration_secs: timeout_duration.as_secs(),
    })?
    .map_err(|err| WebpackBuildError::CommandFailed {
        exit_code: None,
        message: err.to_string(),
    })?;

    let log_excerpt = collect_log_excerpt(&output.stdout, &output.stderr);
    if !output.status.success() {
        return Err(WebpackBuildError::CommandFailed {
            exit_code: output.status.code(),
            message: log_excerpt,
        });
    }

    let bundle_path = record.bundle_path();
    if !bundle_path.is_file() {
        return Err(WebpackBuildError::BundleMissing { path: bundle_path });
    }
    let bundle_sha256 = history_fs::compute_sha256(&bundle_path)?;
    let bundle_size = history_fs::file_size(&bundle_path)?;

    Ok(BundleBuildResponse {
        job_id: job_id.to_string(),
        status: "succeeded",
        bundle_path: bundle_path.to_string_lossy().to_string(),
        bundle_size,
        bundle_sha256,
        log_excerpt,
        duration_ms: start.elapsed().as_millis(),
    })
}

async fn spawn_webpack(
    request: &BundleBuildRequest,
    config: &SidecarConfig,
    project_root: &Path,
    mode: Mode,
) -> std::io::Result<std::process::Output> {
    let bin_path =
        webpack_helpers::resolve_bin_path(config.devserver.bin.as_deref(), project_root);
    let mut command = webpack_helpers::build_webpack_build_command(
        webpack_helpers::WebpackCommandConfig {
            bin_path: bin_path.as_deref(),
            project_root,
            node_env: mode.node_env(),
        },
        webpack_helpers::WebpackBuildRequest {
            mode: mode.as_str(),
            extra_args: &request.extra_args,
            env_overrides: &request.env_overrides,
        },
    );

    info!(
        target: "webpack_sidecar::bundler",
        mode = %mode,
        extra_args = request.extra_args.len(),
        root = %project_root.display(),
        "Starting webpack build"
    );

    command.output().await
}

fn collect_log_excerpt(stdout: &[u8], stderr: &[u8]) -> String {
    webpack_helpers::collect_log_excerpt(stdout, stderr, LOG_EXCERPT_LIMIT)
}

pub fn validation_error_to_report(err: BuildRequestValidationError) -> Value {
    build_report(
        &INVALID_INPUT_FAILURE,
        json!({ "reason": err.to_string() }),
        false,
    )
}

pub fn runtime_error_to_report(err: WebpackBuildError, job_id: Uuid) -> Value {
    match err {
        WebpackBuildError::Timeout { duration_secs } => build_report_with_job(
            &TIMEOUT_FAILURE,
            json!({ "duration_secs": duration_secs }),
            true,
            job_id,
        ),
        WebpackBuildError::EntryMissing { path } => build_report_with_job(
            &ENTRY_MISSING_FAILURE,
            json!({ "path": path.to_string_lossy() }),
            false,
            job_id,
        ),
        WebpackBuildError::BundleMissing { path } => build_report_with_job(
            &BUNDLE_MISSING_FAILURE,
            json!({ "path": path.to_string_lossy() }),
            false,
            job_id,
        ),
        WebpackBuildError::HistoryFailure { message } => build_report_with_job(
            &HISTORY_FAILURE,
            json!({ "reason": message }),
            true,
            job_id,
        ),
        WebpackBuildError::CommandFailed { exit_code, message } => {
            let mut builder = BUILD_FAILED_FAILURE
                .builder()
                .details(json!({ "log_excerpt": message }))
                .retryable(true)
                .with_context_field("job_id", json!(job_id.to_string()));
            if let Some(code) = exit_code {
                builder = builder.with_context_field("webpack_exit_code", json!(code));
            }
            builder.build().expect("descriptor is valid")
        }
    }
}

fn build_report(desc: &'static FailureDescriptor, details: Value, retryable: bool) -> Value {
    desc.builder()
        .details(details)
        .retryable(retryable)
        .build()
        .expect("descriptor is valid")
}

fn build_report_with_job(
    desc: &'static FailureDescriptor,
    details: Value,
    retryable: bool,
    job_id: Uuid,
) -> Value {
    desc.builder()
        .details(details)
        .retryable(retryable)
        .with_context_field("job_id", json!(job_id.to_string()))
        .build()
        .expect("descriptor is valid")
}
