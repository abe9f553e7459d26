use std::{process::ExitCode, sync::Arc};

use anyhow::{anyhow, Context, Error};
use tokio::net::TcpListener;

use crate::{
    bundler::{AssetProxy, BuildHistory, BundlerJobQueue, DevServer, WebpackConfig},
    cli::LaunchProfile,
    server::{
        config::SidecarConfig,
        runtime::{build_router, SidecarState},
    },
};

/// Bundles a runtime error message with an exit code and optional structured report.
#[derive(Debug)]
pub struct RuntimeExit {
    message: String,
    exit_code: ExitCode,
    failure_report: Option<serde_json::Value>,
}

impl RuntimeExit {
    pub fn structured(report: serde_json::Value, exit_code: ExitCode) -> Self {
        let message = report
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("runtime failure")
            .to_string();
        Self {
            message,
            exit_code,
            failure_report: Some(report),
        }
    }

    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:?}"),
            exit_code: ExitCode::FAILURE,
            failure_report: None,
        }
    }

    pub fn report(self) -> ExitCode {
        if let Some(data) = self.failure_report {
            if let Ok(serialized) = serde_json::to_string(&data) {
                eprintln!("{serialized}");
            } else {
                eprintln!("{}", self.message);
            }
        } else {
            eprintln!("{}", self.message);
        }
        self.exit_code
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }
}

/// Start the sidecar: construct the record, spawn the dev server, and serve
/// the HTTP routes until a shutdown signal arrives.
pub async fn run_server(
    profile: LaunchProfile,
    mut config: SidecarConfig,
) -> Result<(), RuntimeExit> {
    if let Some(port) = profile.devserver_port_override {
        if port == 0 {
            return Err(RuntimeExit::from_error(anyhow!(
                "dev-server port 0 is not routable; specify a value between 1 and 65535"
            )));
        }
        config.devserver.port = port;
    }

    if profile.listen_port == config.devserver.port {
        return Err(RuntimeExit::from_error(anyhow!(
            "listen port {port} collides with the dev-server port; pass a different --port",
            port = profile.listen_port
        )));
    }

    let record = WebpackConfig::from_root_with(&profile.project_root, &config.record_settings())
        .map_err(RuntimeExit::from_error)?;

    let state = Arc::new(SidecarState {
        supervisor: DevServer::new(&config, profile.project_root.clone()),
        proxy: AssetProxy::new(&config),
        queue: BundlerJobQueue::new(),
        history: BuildHistory::new(config.build.job_ttl_secs, config.build.cleanup_schedule_secs),
        record,
        config,
        project_root: profile.project_root.clone(),
    });

    let listen_addr = format!("127.0.0.1:{}", profile.listen_port);
    let pending_jobs = state.queue.pending_jobs().await;
    crate::lib::telemetry::emit_sidecar_mode(&crate::lib::telemetry::SidecarModeTelemetry {
        listen_addr: &listen_addr,
        devserver_port: state.config.devserver.port,
        project_root: profile.project_root.to_string_lossy().as_ref(),
        config_path: state.config.source_path.to_string_lossy().as_ref(),
        pending_jobs,
        launch_args: &profile.launch_args,
    });

    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind TCP port {listen_addr}"))
        .map_err(RuntimeExit::from_error)?;
    tracing::info!(
        target: "webpack_sidecar::runtime",
        bind_addr = %listen_addr,
        "Started listening for asset requests"
    );

    state.supervisor.start().await.map_err(|err| {
        RuntimeExit::from_error(Error::new(err).context("failed to start the webpack dev server"))
    })?;

    let app = build_router(state.clone());
    let shutdown_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            if let Err(err) = shutdown_state.supervisor.stop().await {
                tracing::warn!(
                    target: "webpack_sidecar::runtime",
                    error = %err,
                    "Dev server did not stop cleanly"
                );
            }
        })
        .await
        .map_err(RuntimeExit::from_error)?;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(
            target: "webpack_sidecar::runtime",
            error = %err,
            "Failed to listen for the shutdown signal"
        );
        return;
    }
    tracing::info!(
        target: "webpack_sidecar::runtime",
        "Shutdown signal received; stopping the dev server"
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::tempdir;

    use crate::{
        bundler::record::Mode,
        server::config::{BuildSection, BundleSection, DevServerSection},
    };

    use super::*;

    fn sample_profile(root: PathBuf, listen_port: u16) -> LaunchProfile {
        LaunchProfile {
            config_path: None,
            project_root: root,
            listen_port,
            devserver_port_override: None,
            launch_args: vec![],
        }
    }

    fn sample_config(devserver_port: u16) -> SidecarConfig {
        SidecarConfig {
            bundle: BundleSection {
                mode: Mode::Development,
                entry: "./index.js".into(),
                filename: "app.bundle.js".into(),
            },
            devserver: DevServerSection {
                host: "localhost".into(),
                port: devserver_port,
                bin: None,
                startup_timeout_secs: 5,
            },
            build: BuildSection {
                max_build_minutes: 1,
                job_ttl_secs: 60,
                cleanup_schedule_secs: 30,
            },
            source_path: PathBuf::from("sidecar.toml"),
        }
    }

    #[tokio::test]
    async fn colliding_ports_refuse_to_start() {
        let temp = tempdir().expect("can create temp directory");
        let profile = sample_profile(temp.path().to_path_buf(), 9381);

        let error = run_server(profile, sample_config(9381))
            .await
            .expect_err("colliding ports should fail");

        assert!(error.message.contains("collides"));
    }

    #[tokio::test]
    async fn devserver_port_override_replaces_the_configured_port() {
        let temp = tempdir().expect("can create temp directory");
        let mut profile = sample_profile(temp.path().to_path_buf(), 8807);
        profile.devserver_port_override = Some(8807);

        let error = run_server(profile, sample_config(9381))
            .await
            .expect_err("the overridden port should reach the collision check");

        assert!(error.message.contains("collides"));
    }

    #[tokio::test]
    async fn zero_devserver_port_override_is_rejected() {
        let temp = tempdir().expect("can create temp directory");
        let mut profile = sample_profile(temp.path().to_path_buf(), 8807);
        profile.devserver_port_override = Some(0);

        let error = run_server(profile, sample_config(9381))
            .await
            .expect_err("port 0 should fail");

        assert!(error.message.contains("not routable"));
    }

    #[tokio::test]
    async fn missing_project_root_refuses_to_start() {
        let temp = tempdir().expect("can create temp directory");
        let missing = temp.path().join("gone");
        let profile = sample_profile(missing, 8807);

        let result = run_server(profile, sample_config(9381)).await;

        assert!(result.is_err());
    }

    #[test]
    fn structured_exit_surfaces_report_message() {
        let report = serde_json::json!({
            "code": "timeout",
            "message": "webpack build timed out",
            "retryable": true,
        });

        let exit = RuntimeExit::structured(report, ExitCode::FAILURE);

        assert_eq!(exit.message, "webpack build timed out");
        assert!(exit.failure_report.is_some());
    }
}
