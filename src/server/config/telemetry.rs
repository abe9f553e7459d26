use tracing::{debug, info};

use super::{SidecarConfig, CONFIG_ENV_KEY, DEFAULT_CONFIG_PATH};

pub fn log_env_source(path: &std::path::Path, from_env: bool) {
    if from_env {
        info!(
            target: "webpack_sidecar::config",
            path = %path.display(),
            "Loading configuration using SIDECAR_CONFIG_PATH environment variable"
        );
    } else {
        debug!(
            target: "webpack_sidecar::config",
            path = %path.display(),
            env = CONFIG_ENV_KEY,
            default = DEFAULT_CONFIG_PATH,
            "SIDECAR_CONFIG_PATH not set; using default sidecar.toml"
        );
    }
}

pub fn log_defaults(path: &std::path::Path) {
    debug!(
        target: "webpack_sidecar::config",
        path = %path.display(),
        "No sidecar.toml found; using built-in defaults"
    );
}

pub fn log_loaded(config: &SidecarConfig) {
    info!(
        target: "webpack_sidecar::config",
        path = %config.source_path.display(),
        mode = %config.bundle.mode,
        entry = %config.bundle.entry,
        filename = %config.bundle.filename,
        devserver_port = config.devserver.port,
        max_build_minutes = config.build.max_build_minutes,
        job_ttl_secs = config.build.job_ttl_secs,
        "Configuration file loaded successfully"
    );
}
