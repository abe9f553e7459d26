//! Load and validate sidecar configuration.
use std::{env, path::PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use crate::bundler::record::RecordSettings;
use crate::lib::errors::ConfigError;

pub mod build;
pub mod bundle;
pub mod devserver;
pub mod telemetry;

pub use build::{
    parse_build_section, BuildSection, RawBuildSection, DEFAULT_CLEANUP_SCHEDULE_SECS,
    DEFAULT_JOB_TTL_SECS, DEFAULT_MAX_BUILD_MINUTES,
};
pub use bundle::{parse_bundle_section, BundleSection, RawBundleSection};
pub use devserver::{
    parse_devserver_section, DevServerSection, RawDevServerSection, DEFAULT_DEV_SERVER_HOST,
    DEFAULT_STARTUP_TIMEOUT_SECS,
};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_KEY: &str = "SIDECAR_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "sidecar.toml";

/// Top-level configuration container.
#[derive(Debug, Clone)]
pub struct SidecarConfig {
    pub bundle: BundleSection,
    pub devserver: DevServerSection,
    pub build: BuildSection,
    pub source_path: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
struct RawSidecarConfig {
    bundle: Option<RawBundleSection>,
    devserver: Option<RawDevServerSection>,
    build: Option<RawBuildSection>,
}

impl SidecarConfig {
    /// Prefer `SIDECAR_CONFIG_PATH` if set; otherwise read `sidecar.toml`.
    pub fn load_from_env_or_default() -> Result<Self, ConfigError> {
        let (path, from_env) = match env::var(CONFIG_ENV_KEY) {
            Ok(value) if !value.trim().is_empty() => (PathBuf::from(value), true),
            _ => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        telemetry::log_env_source(&path, from_env);

        if from_env {
            return Self::load_from_path(path);
        }
        Self::load_optional(path)
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        info!(
            target: "webpack_sidecar::config",
            path = %path.display(),
            "Starting configuration load"
        );

        let builder = config::Config::builder().add_source(config::File::from(path.clone()));
        let document = builder.build().map_err(|err| {
            let error = ConfigError::from_read_error(path.clone(), err);
            error!(
                target: "webpack_sidecar::config",
                path = %path.display(),
                reason = %error,
                "Failed to read configuration file"
            );
            error
        })?;

        let raw: RawSidecarConfig = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            error!(
                target: "webpack_sidecar::config",
                path = %path.display(),
                reason = %error,
                "Failed to parse configuration file"
            );
            error
        })?;

        let config = Self::from_raw(raw, path.clone()).map_err(|err| {
            error!(
                target: "webpack_sidecar::config",
                path = %path.display(),
                reason = %err,
                "Failed to validate configuration file"
            );
            err
        })?;

        telemetry::log_loaded(&config);
        Ok(config)
    }

    /// Settings the configuration record is built from.
    pub fn record_settings(&self) -> RecordSettings {
        self.bundle.record_settings(self.devserver.port)
    }

    // Every section has a complete set of defaults, so a file missing from
    // the default location is not an error.
    fn load_optional(path: PathBuf) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load_from_path(path);
        }

        telemetry::log_defaults(&path);
        Self::from_raw(RawSidecarConfig::default(), path)
    }

    fn from_raw(raw: RawSidecarConfig, path: PathBuf) -> Result<Self, ConfigError> {
        let bundle = parse_bundle_section(raw.bundle, &path)?;
        let devserver = parse_devserver_section(raw.devserver, &path)?;
        let build = parse_build_section(raw.build, &path)?;

        Ok(Self {
            bundle,
            devserver,
            build,
            source_path: path,
        })
    }
}
