//! Shared helpers for building webpack commands.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use tokio::process::Command;

/// Package runner used when no explicit webpack binary is configured.
pub const NPX_PROGRAM: &str = "npx";
/// Package name handed to the runner.
pub const WEBPACK_PACKAGE: &str = "webpack";

pub struct WebpackCommandConfig<'a> {
    pub bin_path: Option<&'a Path>,
    pub project_root: &'a Path,
    pub node_env: &'a str,
}

pub struct WebpackServeRequest {
    pub port: u16,
}

pub struct WebpackBuildRequest<'a> {
    pub mode: &'a str,
    pub extra_args: &'a [String],
    pub env_overrides: &'a BTreeMap<String, String>,
}

/// Build a `webpack serve` command for the dev-server supervisor.
pub fn build_webpack_serve_command(
    config: WebpackCommandConfig<'_>,
    request: WebpackServeRequest,
) -> Command {
    let mut command = base_command(&config);
    command.arg("serve");
    command.arg("--port").arg(request.port.to_string());
    command
}

/// Build a one-shot `webpack build` command.
pub fn build_webpack_build_command(
    config: WebpackCommandConfig<'_>,
    request: WebpackBuildRequest<'_>,
) -> Command {
    let mut command = base_command(&config);
    command.arg("build");
    command.arg("--mode").arg(request.mode);

    for arg in request.extra_args {
        command.arg(arg);
    }
    for (key, value) in request.env_overrides {
        command.env(key, value);
    }

    command
}

/// Resolve the program and shared process settings for a webpack invocation.
///
/// The parent environment is inherited so `npx` can resolve node and the
/// project's local packages; `NODE_ENV` is layered on top.
fn base_command(config: &WebpackCommandConfig<'_>) -> Command {
    let mut command = match config.bin_path {
        Some(bin_path) => Command::new(bin_path),
        None => {
            let mut npx = Command::new(NPX_PROGRAM);
            npx.arg(WEBPACK_PACKAGE);
            npx
        }
    };
    command.kill_on_drop(true);
    command.current_dir(config.project_root);
    command.env("NODE_ENV", config.node_env);
    command
}

/// Resolve a configured webpack binary against the project root.
pub fn resolve_bin_path(bin: Option<&Path>, project_root: &Path) -> Option<PathBuf> {
    bin.map(|path| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_root.join(path)
        }
    })
}

/// Merge stdout/stderr and take at most `limit` characters from the end.
pub fn collect_log_excerpt(stdout: &[u8], stderr: &[u8], limit: usize) -> String {
    let mut combined = Vec::with_capacity(stdout.len() + stderr.len());
    combined.extend_from_slice(stdout);
    combined.extend_from_slice(stderr);
    let text = String::from_utf8_lossy(&combined);
    if text.chars().count() <= limit {
        return text.to_string();
    }
    text.chars()
        .rev()
        .take(limit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}
