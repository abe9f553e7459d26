//! Launch profile resolution.
//!
//! A launch profile captures everything the runtime needs before the
//! configuration file is read: where that file lives, which project root the
//! bundler operates on, and which port the sidecar itself listens on.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

use crate::server::config::CONFIG_ENV_KEY;

/// Default port the sidecar binds for asset and build requests.
pub const DEFAULT_LISTEN_PORT: u16 = 8807;

/// Lowest listen port accepted from the command line.
const MIN_LISTEN_PORT: u16 = 1024;

/// Resolved launch parameters for sidecar mode.
#[derive(Debug, Clone)]
pub struct LaunchProfile {
    /// Explicit configuration file, from `--config` or `SIDECAR_CONFIG_PATH`.
    /// `None` means the default `sidecar.toml` lookup applies.
    pub config_path: Option<PathBuf>,
    /// Directory holding the webpack project.
    pub project_root: PathBuf,
    /// Port the sidecar listens on.
    pub listen_port: u16,
    /// Overrides the configured dev-server port for this run.
    pub devserver_port_override: Option<u16>,
    /// Echo of the effective arguments, recorded in startup telemetry.
    pub launch_args: Vec<String>,
}

/// Resolve the configuration path in the order: CLI override → env var.
///
/// Relative paths are anchored at the working directory so the sidecar can be
/// launched from anywhere.
pub fn resolve_config_path(override_path: Option<PathBuf>) -> Result<Option<PathBuf>> {
    let candidate = override_path.or_else(|| {
        env::var(CONFIG_ENV_KEY)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
    });

    let Some(path) = candidate else {
        return Ok(None);
    };
    Ok(Some(absolutize(path)?))
}

/// Resolve the project root from the CLI override or the working directory.
pub fn resolve_project_root(override_root: Option<PathBuf>) -> Result<PathBuf> {
    match override_root {
        Some(root) => absolutize(root),
        None => env::current_dir().context("failed to obtain current directory"),
    }
}

/// Reject listen ports in the privileged range.
pub fn validate_listen_port(port: u16) -> Result<u16> {
    if port < MIN_LISTEN_PORT {
        return Err(anyhow!(
            "listen port {port} is below {MIN_LISTEN_PORT}; the sidecar only binds unprivileged ports"
        ));
    }
    Ok(port)
}

/// Build launch arguments suitable for reproduction/logging.
pub fn build_launch_args(
    listen_port: u16,
    project_root: &Path,
    config_path: Option<&Path>,
) -> Vec<String> {
    let mut launch_args = vec![
        format!("--port={listen_port}"),
        format!("--root={}", project_root.display()),
    ];
    if let Some(path) = config_path {
        launch_args.push(format!("--config={}", path.display()));
    }
    launch_args
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = env::current_dir().context("failed to obtain current directory")?;
    Ok(cwd.join(path))
}
