use std::{
    env,
    ffi::CString,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
    process::Command,
};

use crate::lib::{errors::ToolchainError, webpack::WEBPACK_PACKAGE};

/// Abstraction for environment access during toolchain diagnosis.
pub trait ToolchainProbe {
    fn locate_binary(&self, name: &'static str) -> Result<PathBuf, ToolchainError>;
    fn node_version(&self) -> Result<String, ToolchainError>;
    fn node_modules_present(&self, project_root: &Path) -> bool;
    fn local_webpack(&self, project_root: &Path) -> Option<PathBuf>;
    fn disk_free_bytes(&self, path: &Path) -> Result<u64, ToolchainError>;
}

/// Probe that operates against the real environment.
pub struct SystemToolchainProbe;

impl ToolchainProbe for SystemToolchainProbe {
    fn locate_binary(&self, name: &'static str) -> Result<PathBuf, ToolchainError> {
        which::which(name).map_err(|_| ToolchainError::BinaryMissing { name })
    }

    fn node_version(&self) -> Result<String, ToolchainError> {
        let output = Command::new("node")
            .arg("--version")
            .output()
            .map_err(|err| ToolchainError::Internal {
                message: format!("Failed to run node: {err}"),
            })?;
        if !output.status.success() {
            return Err(ToolchainError::Internal {
                message: format!(
                    "node --version failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn node_modules_present(&self, project_root: &Path) -> bool {
        project_root.join("node_modules").is_dir()
    }

    fn local_webpack(&self, project_root: &Path) -> Option<PathBuf> {
        let candidate = project_root.join("node_modules/.bin").join(WEBPACK_PACKAGE);
        candidate.is_file().then_some(candidate)
    }

    fn disk_free_bytes(&self, path: &Path) -> Result<u64, ToolchainError> {
        let target = if path.exists() {
            path.to_path_buf()
        } else {
            PathBuf::from("/")
        };
        let c_path =
            CString::new(target.as_os_str().as_bytes()).map_err(|err| ToolchainError::Internal {
                message: format!("Failed to parse disk path: {err}"),
            })?;
        let mut stats = std::mem::MaybeUninit::<libc::statfs>::uninit();
        let result = unsafe { libc::statfs(c_path.as_ptr(), stats.as_mut_ptr()) };
        if result != 0 {
            return Err(ToolchainError::Internal {
                message: "statfs call failed".into(),
            });
        }
        let stats = unsafe { stats.assume_init() };

        #[cfg(target_os = "linux")]
        let available_blocks = stats.f_bavail;
        #[cfg(target_os = "macos")]
        let available_blocks = stats.f_bavail;
        #[cfg(all(not(target_os = "linux"), not(target_os = "macos")))]
        let available_blocks = stats.f_bavail as u64;

        #[cfg(target_os = "linux")]
        let block_size = u64::try_from(stats.f_bsize).map_err(|_| ToolchainError::Internal {
            message: format!("statfs returned negative block size: {}", stats.f_bsize),
        })?;
        #[cfg(target_os = "macos")]
        let block_size = u64::from(stats.f_bsize);
        #[cfg(all(not(target_os = "linux"), not(target_os = "macos")))]
        let block_size = stats.f_bsize as u64;

        available_blocks
            .checked_mul(block_size)
            .ok_or_else(|| ToolchainError::Internal {
                message: "statfs overflow when computing free bytes".into(),
            })
    }
}

/// Probe driven entirely by environment variables, for tests and CI.
pub struct EnvToolchainProbe;

impl ToolchainProbe for EnvToolchainProbe {
    fn locate_binary(&self, name: &'static str) -> Result<PathBuf, ToolchainError> {
        let listed =
            env::var("SIDECAR_TOOLCHAIN_BINARIES").unwrap_or_else(|_| "node,npx".into());
        let available = listed.split(',').map(str::trim).any(|entry| entry == name);
        if available {
            Ok(PathBuf::from("/usr/bin").join(name))
        } else {
            Err(ToolchainError::BinaryMissing { name })
        }
    }

    fn node_version(&self) -> Result<String, ToolchainError> {
        Ok(env::var("SIDECAR_TOOLCHAIN_NODE_VERSION").unwrap_or_else(|_| "v20.0.0".into()))
    }

    fn node_modules_present(&self, _project_root: &Path) -> bool {
        matches!(
            env::var("SIDECAR_TOOLCHAIN_NODE_MODULES")
                .unwrap_or_else(|_| "present".into())
                .to_lowercase()
                .as_str(),
            "present" | "true" | "1"
        )
    }

    fn local_webpack(&self, project_root: &Path) -> Option<PathBuf> {
        match env::var("SIDECAR_TOOLCHAIN_WEBPACK")
            .unwrap_or_else(|_| "local".into())
            .to_lowercase()
            .as_str()
        {
            "local" => Some(project_root.join("node_modules/.bin").join(WEBPACK_PACKAGE)),
            _ => None,
        }
    }

    fn disk_free_bytes(&self, _path: &Path) -> Result<u64, ToolchainError> {
        Ok(env::var("SIDECAR_TOOLCHAIN_DISK_BYTES")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(u64::MAX / 2))
    }
}
