use std::{env, fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{body::to_bytes, response::Response};
use serde_json::Value;
use tempfile::TempDir;

use webpack_sidecar::{
    bundler::{AssetProxy, BuildHistory, BundlerJobQueue, DevServer, Mode, WebpackConfig},
    server::{
        config::{BuildSection, BundleSection, DevServerSection, SidecarConfig},
        runtime::SidecarState,
    },
};

pub const BINARY_PATH: &str = env!("CARGO_BIN_EXE_webpack-sidecar");

pub fn mock_webpack_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mock-webpack.sh")
}

/// Create a scratch webpack project containing the default entry file.
pub fn scratch_project() -> Result<TempDir> {
    let temp = TempDir::new().context("failed to create scratch project")?;
    fs::write(temp.path().join("index.js"), "console.log(1);\n")
        .context("failed to write entry file")?;
    Ok(temp)
}

/// Select the mock webpack behavior for one scratch project.
pub fn set_mock_behavior(project: &TempDir, behavior: &str) -> Result<()> {
    fs::write(project.path().join(".mock-behavior"), behavior)
        .context("failed to write mock behavior file")
}

pub fn test_sidecar_config(devserver_port: u16, max_build_minutes: u16) -> SidecarConfig {
    SidecarConfig {
        bundle: BundleSection {
            mode: Mode::Development,
            entry: "./index.js".into(),
            filename: "app.bundle.js".into(),
        },
        devserver: DevServerSection {
            host: "127.0.0.1".into(),
            port: devserver_port,
            bin: Some(mock_webpack_path()),
            startup_timeout_secs: 5,
        },
        build: BuildSection {
            max_build_minutes,
            job_ttl_secs: 600,
            cleanup_schedule_secs: 60,
        },
        source_path: PathBuf::from("tests/fixtures/sidecar_valid.toml"),
    }
}

pub fn test_sidecar_config_with_ttl(
    devserver_port: u16,
    max_build_minutes: u16,
    ttl_secs: u32,
) -> SidecarConfig {
    let mut config = test_sidecar_config(devserver_port, max_build_minutes);
    config.build.job_ttl_secs = ttl_secs;
    config.build.cleanup_schedule_secs = 30;
    config
}

/// Assemble the full runtime state for in-process router tests.
pub fn build_state(config: SidecarConfig, project_root: PathBuf) -> Result<Arc<SidecarState>> {
    let record = WebpackConfig::from_root_with(&project_root, &config.record_settings())
        .context("failed to build the configuration record")?;
    let history = BuildHistory::with_root(
        project_root.join("jobs"),
        config.build.job_ttl_secs,
        config.build.cleanup_schedule_secs,
    );

    Ok(Arc::new(SidecarState {
        supervisor: DevServer::new(&config, project_root.clone()),
        proxy: AssetProxy::new(&config),
        queue: BundlerJobQueue::new(),
        history,
        record,
        config,
        project_root,
    }))
}

/// Decode a router response body as JSON.
pub async fn json_body(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .context("failed to read response body")?;
    serde_json::from_slice(&bytes).context("response body is not JSON")
}

pub fn enable_fast_timeout() {
    env::set_var("SIDECAR_TEST_TIME_SCALE", "1");
}
