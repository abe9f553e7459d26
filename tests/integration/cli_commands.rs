use std::{
    fs,
    process::{Command as StdCommand, Stdio},
    time::Duration,
};

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::TempDir;
use tokio::{process::Command, time::sleep};

use crate::common::{mock_webpack_path, scratch_project, BINARY_PATH};

/// Write a sidecar.toml pointing webpack at the mock script.
fn write_mock_config(project: &TempDir) -> Result<String> {
    let config_path = project.path().join("sidecar.toml");
    let content = format!(
        "[devserver]\nbin = \"{bin}\"\n",
        bin = mock_webpack_path().display()
    );
    fs::write(&config_path, content).context("failed to write sidecar.toml")?;
    Ok(config_path.display().to_string())
}

#[test]
fn config_print_emits_the_record_json() -> Result<()> {
    let temp = scratch_project()?;

    let output = StdCommand::new(BINARY_PATH)
        .args(["config", "print", "--root"])
        .arg(temp.path())
        .env_remove("SIDECAR_CONFIG_PATH")
        .output()
        .context("config print should run")?;

    assert!(output.status.success(), "status: {:?}", output.status);
    let record: Value =
        serde_json::from_slice(&output.stdout).context("stdout should be the record JSON")?;
    assert_eq!(record["mode"], "development");
    assert_eq!(record["devServer"]["port"], 9381);
    Ok(())
}

#[test]
fn build_command_produces_a_bundle() -> Result<()> {
    let temp = scratch_project()?;
    let config_path = write_mock_config(&temp)?;

    let output = StdCommand::new(BINARY_PATH)
        .args(["build", "--config", &config_path, "--root"])
        .arg(temp.path())
        .env("SIDECAR_TEST_TIME_SCALE", "1")
        .output()
        .context("build command should run")?;

    assert!(
        output.status.success(),
        "stderr: {stderr}",
        stderr = String::from_utf8_lossy(&output.stderr)
    );
    let payload: Value =
        serde_json::from_slice(&output.stdout).context("stdout should be the build payload")?;
    assert_eq!(payload["status"], "succeeded");
    assert!(
        temp.path().join("dist/app.bundle.js").is_file(),
        "bundle should exist on disk"
    );
    Ok(())
}

#[test]
fn doctor_passes_with_a_healthy_env_probe() -> Result<()> {
    let temp = scratch_project()?;

    let output = StdCommand::new(BINARY_PATH)
        .args(["doctor", "--root"])
        .arg(temp.path())
        .env_remove("SIDECAR_CONFIG_PATH")
        .env("SIDECAR_TOOLCHAIN_PROBE", "env")
        .env_remove("SIDECAR_TOOLCHAIN_BINARIES")
        .env_remove("SIDECAR_TOOLCHAIN_WEBPACK")
        .env_remove("SIDECAR_TOOLCHAIN_NODE_MODULES")
        .output()
        .context("doctor should run")?;

    assert!(output.status.success(), "status: {:?}", output.status);
    let report: Value =
        serde_json::from_slice(&output.stdout).context("stdout should be the report JSON")?;
    assert_eq!(report["status"], "ok");
    Ok(())
}

#[test]
fn doctor_fails_when_webpack_cannot_run() -> Result<()> {
    let temp = scratch_project()?;

    let output = StdCommand::new(BINARY_PATH)
        .args(["doctor", "--root"])
        .arg(temp.path())
        .env_remove("SIDECAR_CONFIG_PATH")
        .env("SIDECAR_TOOLCHAIN_PROBE", "env")
        .env("SIDECAR_TOOLCHAIN_BINARIES", "node")
        .env("SIDECAR_TOOLCHAIN_WEBPACK", "missing")
        .output()
        .context("doctor should run")?;

    assert!(
        !output.status.success(),
        "doctor must exit non-zero when a check fails"
    );
    let report: Value =
        serde_json::from_slice(&output.stdout).context("stdout should be the report JSON")?;
    assert_eq!(report["status"], "error");
    let checks = report["checks"].as_array().expect("checks array");
    let webpack_check = checks
        .iter()
        .find(|check| check["name"] == "webpack_binary")
        .expect("webpack_binary check");
    assert_eq!(webpack_check["result"], "fail");
    Ok(())
}

#[tokio::test]
async fn serve_answers_healthz_and_stops_on_interrupt() -> Result<()> {
    // Fixed port: the listen port range excludes 0, so an ephemeral bind is
    // not available through the CLI.
    const LISTEN_PORT: u16 = 18707;

    let temp = scratch_project()?;
    let config_path = write_mock_config(&temp)?;

    let mut child = Command::new(BINARY_PATH)
        .args(["serve", "--port", "18707", "--config", &config_path, "--root"])
        .arg(temp.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to spawn the sidecar")?;

    let health_url = format!("http://127.0.0.1:{LISTEN_PORT}/healthz");
    let mut health = None;
    for _ in 0..40 {
        match reqwest::get(&health_url).await {
            Ok(response) if response.status().is_success() => {
                health = Some(response.json::<Value>().await?);
                break;
            }
            _ => sleep(Duration::from_millis(250)).await,
        }
    }
    let health = health.expect("healthz should answer while the sidecar runs");
    assert_eq!(health["status"], "ok");
    assert_eq!(health["devserver"]["running"], true);

    let pid = child.id().expect("sidecar pid") as libc::pid_t;
    unsafe {
        libc::kill(pid, libc::SIGINT);
    }

    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .context("sidecar should exit after SIGINT")??;
    assert!(status.success(), "exit status: {status:?}");
    Ok(())
}
