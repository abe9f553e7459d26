//! CLI entrypoint module structure.
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::anyhow;
use chrono::Utc;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    bundler::{
        self, diagnose_toolchain, BuildHistory, BundleBuildRequest, WebpackConfig,
    },
    lib::{
        errors::{ConfigError, WebpackBuildError},
        fs::{write_generated_file, GeneratedFileStatus},
    },
    server::{config::SidecarConfig, runtime::RuntimeExit},
};

pub mod args;
pub mod profile;

pub use args::{
    BuildArgs, CliCommand, CliInvocation, ConfigArgs, ConfigCommand, ConfigEmitArgs,
    LaunchProfileArgs, ParsedCommand, ServeArgs, UtilityCommand,
};
pub use profile::{
    build_launch_args, resolve_config_path, resolve_project_root, validate_listen_port,
    LaunchProfile, DEFAULT_LISTEN_PORT,
};

/// File written by `config emit`.
pub const GENERATED_CONFIG_FILENAME: &str = "webpack.config.js";

/// Result payload plus process exit status for a utility command.
#[derive(Debug)]
pub struct CliOutput {
    pub payload: String,
    pub exit_code: ExitCode,
}

impl CliOutput {
    fn success(payload: String) -> Self {
        Self {
            payload,
            exit_code: ExitCode::SUCCESS,
        }
    }
}

/// Load the sidecar configuration for a resolved profile or invocation.
pub fn load_sidecar_config(config_path: Option<&Path>) -> Result<SidecarConfig, ConfigError> {
    match config_path {
        Some(path) => SidecarConfig::load_from_path(path.to_path_buf()),
        None => SidecarConfig::load_from_env_or_default(),
    }
}

/// Execute CLI command mode and return a user-facing result payload.
pub async fn execute_cli_command(invocation: CliInvocation) -> Result<CliOutput, RuntimeExit> {
    let config =
        load_sidecar_config(invocation.config_path.as_deref()).map_err(RuntimeExit::from_error)?;

    match invocation.command {
        UtilityCommand::Build(build) => {
            run_build_command(&config, &invocation.project_root, build).await
        }
        UtilityCommand::Doctor => run_doctor_command(&invocation.project_root),
        UtilityCommand::Config(command) => {
            run_config_command(&config, &invocation.project_root, command)
        }
    }
}

/// Run a single webpack build outside the HTTP runtime.
///
/// The job is still recorded in build history so the full log lands on disk
/// next to the logs the serve mode writes.
async fn run_build_command(
    config: &SidecarConfig,
    project_root: &Path,
    build: BuildArgs,
) -> Result<CliOutput, RuntimeExit> {
    let record = WebpackConfig::from_root_with(project_root, &config.record_settings())
        .map_err(RuntimeExit::from_error)?;

    let request = BundleBuildRequest {
        mode: build.mode,
        ..BundleBuildRequest::default()
    };
    let history = BuildHistory::new(config.build.job_ttl_secs, config.build.cleanup_schedule_secs);
    let job_id = Uuid::new_v4();

    match bundler::run_build(&request, &record, config, project_root, job_id).await {
        Ok(response) => {
            history
                .record_success(
                    job_id,
                    PathBuf::from(&response.bundle_path),
                    response.bundle_sha256.clone(),
                    response.bundle_size,
                    response.log_excerpt.clone(),
                    Utc::now(),
                )
                .await
                .map_err(RuntimeExit::from_error)?;

            let payload =
                serde_json::to_string_pretty(&response).map_err(RuntimeExit::from_error)?;
            Ok(CliOutput::success(payload))
        }
        Err(error) => {
            let log_excerpt = match &error {
                WebpackBuildError::CommandFailed { message, .. } => message.clone(),
                other => other.to_string(),
            };
            if let Err(store_error) = history.record_failure(job_id, log_excerpt, Utc::now()).await
            {
                warn!(
                    target: "webpack_sidecar::bundler",
                    %job_id,
                    reason = %store_error,
                    "Failed to store the build failure record"
                );
            }

            Err(RuntimeExit::structured(
                bundler::runtime_error_to_report(error, job_id),
                ExitCode::FAILURE,
            ))
        }
    }
}

/// Diagnose the Node toolchain; the exit code reflects failed checks.
fn run_doctor_command(project_root: &Path) -> Result<CliOutput, RuntimeExit> {
    let report = diagnose_toolchain(project_root);
    let exit_code = if report.failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    };
    let payload = serde_json::to_string_pretty(&report).map_err(RuntimeExit::from_error)?;
    Ok(CliOutput { payload, exit_code })
}

fn run_config_command(
    config: &SidecarConfig,
    project_root: &Path,
    command: ConfigCommand,
) -> Result<CliOutput, RuntimeExit> {
    let record = WebpackConfig::from_root_with(project_root, &config.record_settings())
        .map_err(RuntimeExit::from_error)?;

    match command {
        ConfigCommand::Print => {
            let payload = serde_json::to_string_pretty(&record).map_err(RuntimeExit::from_error)?;
            Ok(CliOutput::success(payload))
        }
        ConfigCommand::Emit(emit) => {
            let destination = project_root.join(GENERATED_CONFIG_FILENAME);
            let result = write_generated_file(
                &destination,
                &record.render_config_js(),
                emit.force,
                emit.dry_run,
            )
            .map_err(RuntimeExit::from_error)?;

            let status = match result.status {
                GeneratedFileStatus::Planned => "planned",
                GeneratedFileStatus::Written => "written",
                GeneratedFileStatus::SkippedExisting => {
                    return Err(RuntimeExit::from_error(anyhow!(
                        "{} already exists; re-run with --force to overwrite",
                        destination.display()
                    )));
                }
            };

            let payload = serde_json::to_string_pretty(&json!({
                "status": status,
                "path": result.path,
            }))
            .map_err(RuntimeExit::from_error)?;
            Ok(CliOutput::success(payload))
        }
    }
}
