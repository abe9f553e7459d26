//! Telemetry initialization and bundler job span helpers.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Environment variable controlling the log filter.
pub const LOG_FILTER_ENV: &str = "SIDECAR_LOG";

/// Initialize `tracing` and format developer logs.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span helper to record start and finish of a bundler job.
pub struct JobSpan {
    span: Span,
    started_at: Instant,
    job_id: Uuid,
}

impl JobSpan {
    /// Start a job span.
    pub fn start(job_id: Uuid, job_kind: &'static str) -> Self {
        let span = info_span!(
            target: "webpack_sidecar::bundler",
            "bundler_job",
            %job_id,
            job_kind
        );
        Self {
            span,
            started_at: Instant::now(),
            job_id,
        }
    }

    /// Close the span while recording status and completion info.
    pub fn finish(self, status: &'static str, exit_code: Option<i32>) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        info!(
            target: "webpack_sidecar::bundler",
            job_id = %self.job_id,
            status = status,
            exit_code = exit_code,
            elapsed_ms = elapsed_ms,
            "Completed bundler job"
        );
    }
}

/// Payload for logging sidecar runtime state as structured telemetry.
#[derive(Debug, Serialize)]
pub struct SidecarModeTelemetry<'a> {
    pub listen_addr: &'a str,
    pub devserver_port: u16,
    pub project_root: &'a str,
    pub config_path: &'a str,
    pub pending_jobs: usize,
    pub launch_args: &'a [String],
}

/// Emit sidecar runtime mode to `tracing`.
pub fn emit_sidecar_mode(telemetry: &SidecarModeTelemetry<'_>) {
    info!(
        target: "webpack_sidecar::runtime",
        listen_addr = telemetry.listen_addr,
        devserver_port = telemetry.devserver_port,
        project_root = telemetry.project_root,
        config_path = telemetry.config_path,
        pending_jobs = telemetry.pending_jobs,
        launch_args = ?telemetry.launch_args,
        "Started asset sidecar"
    );
}
