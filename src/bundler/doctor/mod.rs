//! Diagnosis of the local Node toolchain.
//!
//! Backs the `doctor` subcommand: every check runs even after an earlier
//! one fails, so the report lists all problems at once.
mod probe;

use std::{env, path::Path};

use serde::{Deserialize, Serialize};

use crate::lib::{errors::ToolchainError, webpack as webpack_helpers};

pub use probe::{EnvToolchainProbe, SystemToolchainProbe, ToolchainProbe};

const NODE_REMEDY: &str = "Install Node.js 18 or newer and make sure `node` is on PATH.";
const NPX_REMEDY: &str = "Install npm 7 or newer to get `npx`.";
const NODE_MODULES_REMEDY: &str = "Run `npm install` in the project root.";
const WEBPACK_REMEDY: &str = "Run `npm install --save-dev webpack webpack-cli webpack-dev-server`.";
const DISK_REMEDY: &str = "Free up space on the volume holding the project.";

const MIN_DISK_BYTES: u64 = 1024 * 1024 * 1024; // 1GB

/// Overall outcome of the diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainStatus {
    Ok,
    Error,
}

/// Result of an individual check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainCheckResult {
    Pass,
    Warn,
    Fail,
}

/// One diagnosed aspect of the toolchain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainCheck {
    pub name: String,
    pub result: ToolchainCheckResult,
    pub details: String,
    pub remedy: Option<String>,
}

/// Full report produced by the `doctor` subcommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainReport {
    pub status: ToolchainStatus,
    pub checks: Vec<ToolchainCheck>,
}

impl ToolchainReport {
    pub fn failed(&self) -> bool {
        self.status == ToolchainStatus::Error
    }
}

/// Run every check with the probe selected by the environment.
pub fn diagnose_toolchain(project_root: &Path) -> ToolchainReport {
    match env::var("SIDECAR_TOOLCHAIN_PROBE").ok().as_deref() {
        Some("env") | Some("mock") => {
            diagnose_toolchain_with_probe(project_root, &EnvToolchainProbe)
        }
        _ => diagnose_toolchain_with_probe(project_root, &SystemToolchainProbe),
    }
}

/// Version that allows injecting a test double.
pub fn diagnose_toolchain_with_probe<P: ToolchainProbe>(
    project_root: &Path,
    probe: &P,
) -> ToolchainReport {
    let mut checks = Vec::new();

    match probe.locate_binary("node") {
        Ok(path) => match probe.node_version() {
            Ok(version) => checks.push(ToolchainCheck {
                name: "node_binary".into(),
                result: ToolchainCheckResult::Pass,
                details: format!("{version} at {}", path.display()),
                remedy: None,
            }),
            Err(err) => checks.push(ToolchainCheck {
                name: "node_binary".into(),
                result: ToolchainCheckResult::Warn,
                details: format!("{} found, but `node --version` failed: {err}", path.display()),
                remedy: Some(NODE_REMEDY.into()),
            }),
        },
        Err(err) => checks.push(ToolchainCheck {
            name: "node_binary".into(),
            result: ToolchainCheckResult::Fail,
            details: err.to_string(),
            remedy: Some(NODE_REMEDY.into()),
        }),
    }

    let npx_available = match probe.locate_binary(webpack_helpers::NPX_PROGRAM) {
        Ok(path) => {
            checks.push(ToolchainCheck {
                name: "npx_binary".into(),
                result: ToolchainCheckResult::Pass,
                details: format!("npx at {}", path.display()),
                remedy: None,
            });
            true
        }
        Err(err) => {
            checks.push(ToolchainCheck {
                name: "npx_binary".into(),
                result: ToolchainCheckResult::Warn,
                details: err.to_string(),
                remedy: Some(NPX_REMEDY.into()),
            });
            false
        }
    };

    if probe.node_modules_present(project_root) {
        checks.push(ToolchainCheck {
            name: "node_modules".into(),
            result: ToolchainCheckResult::Pass,
            details: format!("{} is present", project_root.join("node_modules").display()),
            remedy: None,
        });
    } else {
        let err = ToolchainError::NodeModulesMissing {
            path: project_root.join("node_modules"),
        };
        checks.push(ToolchainCheck {
            name: "node_modules".into(),
            result: ToolchainCheckResult::Warn,
            details: err.to_string(),
            remedy: Some(NODE_MODULES_REMEDY.into()),
        });
    }

    // A missing local install is survivable as long as npx can fetch webpack.
    match probe.local_webpack(project_root) {
        Some(path) => checks.push(ToolchainCheck {
            name: "webpack_binary".into(),
            result: ToolchainCheckResult::Pass,
            details: format!("webpack installed at {}", path.display()),
            remedy: None,
        }),
        None if npx_available => checks.push(ToolchainCheck {
            name: "webpack_binary".into(),
            result: ToolchainCheckResult::Warn,
            details: "webpack is not installed locally; builds will fall back to `npx webpack`"
                .into(),
            remedy: Some(WEBPACK_REMEDY.into()),
        }),
        None => {
            let err = ToolchainError::WebpackUnavailable {
                root: project_root.to_path_buf(),
            };
            checks.push(ToolchainCheck {
                name: "webpack_binary".into(),
                result: ToolchainCheckResult::Fail,
                details: err.to_string(),
                remedy: Some(WEBPACK_REMEDY.into()),
            });
        }
    }

    match probe.disk_free_bytes(project_root) {
        Ok(free_bytes) if free_bytes >= MIN_DISK_BYTES => checks.push(ToolchainCheck {
            name: "disk_space".into(),
            result: ToolchainCheckResult::Pass,
            details: format!("{free_bytes} bytes free"),
            remedy: None,
        }),
        Ok(free_bytes) => {
            let err = ToolchainError::DiskInsufficient {
                available_bytes: free_bytes,
            };
            checks.push(ToolchainCheck {
                name: "disk_space".into(),
                result: ToolchainCheckResult::Fail,
                details: err.to_string(),
                remedy: Some(DISK_REMEDY.into()),
            });
        }
        Err(err) => checks.push(ToolchainCheck {
            name: "disk_space".into(),
            result: ToolchainCheckResult::Warn,
            details: format!("could not determine free space: {err}"),
            remedy: None,
        }),
    }

    let status = if checks
        .iter()
        .any(|check| check.result == ToolchainCheckResult::Fail)
    {
        ToolchainStatus::Error
    } else {
        ToolchainStatus::Ok
    };

    ToolchainReport { status, checks }
}
