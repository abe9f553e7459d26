use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::bundler::record::DEFAULT_DEV_SERVER_PORT;
use crate::lib::errors::ConfigError;

pub const DEFAULT_DEV_SERVER_HOST: &str = "localhost";
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Dev-server launch and proxy settings.
#[derive(Debug, Clone)]
pub struct DevServerSection {
    pub host: String,
    pub port: u16,
    pub bin: Option<PathBuf>,
    pub startup_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawDevServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub bin: Option<PathBuf>,
    pub startup_timeout_secs: Option<u64>,
}

impl DevServerSection {
    /// Origin asset requests are forwarded to.
    pub fn origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// How long the proxy keeps retrying while the dev server comes up.
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

pub fn parse_devserver_section(
    raw: Option<RawDevServerSection>,
    path: &Path,
) -> Result<DevServerSection, ConfigError> {
    let devserver_raw = raw.unwrap_or_default();

    let host = devserver_raw
        .host
        .unwrap_or_else(|| DEFAULT_DEV_SERVER_HOST.to_string());
    validate_host(&host, path)?;

    let port = devserver_raw.port.unwrap_or(DEFAULT_DEV_SERVER_PORT);
    validate_port(port, path)?;

    let bin = devserver_raw.bin;
    if let Some(bin_path) = &bin {
        validate_bin(bin_path, path)?;
    }

    let startup_timeout_secs = devserver_raw
        .startup_timeout_secs
        .unwrap_or(DEFAULT_STARTUP_TIMEOUT_SECS);
    validate_startup_timeout(startup_timeout_secs, path)?;

    Ok(DevServerSection {
        host,
        port,
        bin,
        startup_timeout_secs,
    })
}

fn validate_host(host: &str, path: &Path) -> Result<(), ConfigError> {
    if !host.trim().is_empty() && !host.contains("://") && !host.contains('/') {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "devserver.host",
        message: format!("Use a bare host name without scheme or path: {host}"),
    })
}

fn validate_port(port: u16, path: &Path) -> Result<(), ConfigError> {
    if port != 0 {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "devserver.port",
        message: "Use a port in the range 1-65535".into(),
    })
}

fn validate_bin(bin: &Path, path: &Path) -> Result<(), ConfigError> {
    if !bin.as_os_str().is_empty() {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "devserver.bin",
        message: "Provide a path to a webpack executable".into(),
    })
}

fn validate_startup_timeout(secs: u64, path: &Path) -> Result<(), ConfigError> {
    if (1..=120).contains(&secs) {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "devserver.startup_timeout_secs",
        message: "Specify a value between 1 and 120 seconds".into(),
    })
}
