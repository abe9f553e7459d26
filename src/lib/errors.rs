use std::{io, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration file.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize TOML into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Required field is missing.
    #[error("Configuration file {path} is missing `{field}`")]
    MissingField { path: PathBuf, field: &'static str },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
    /// The project root used for path resolution does not exist or is unreadable.
    #[error("Failed to resolve project root {path}: {source}")]
    RootDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// High-level failure types returned during a one-shot webpack build.
#[derive(Debug, Error)]
pub enum WebpackBuildError {
    #[error("webpack exited abnormally (exit={exit_code:?}): {message}")]
    CommandFailed {
        exit_code: Option<i32>,
        message: String,
    },
    #[error("webpack build timed out after {duration_secs} seconds")]
    Timeout { duration_secs: u64 },
    #[error("entry point {path} does not exist")]
    EntryMissing { path: PathBuf },
    #[error("webpack reported success but the bundle {path} is missing")]
    BundleMissing { path: PathBuf },
    #[error("Failed to process build history: {message}")]
    HistoryFailure { message: String },
}

/// Failures raised by the dev-server supervisor.
#[derive(Debug, Error)]
pub enum DevServerError {
    #[error("process is already running")]
    AlreadyRunning,
    #[error("webpack not running")]
    NotRunning,
    #[error("webpack not started")]
    NotStarted,
    #[error("could not start webpack: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
    #[error("failed waiting for webpack to exit: {source}")]
    Wait {
        #[source]
        source: io::Error,
    },
    #[error("failed to interrupt webpack: {source}")]
    Interrupt {
        #[source]
        source: io::Error,
    },
}

/// Failures surfaced while proxying asset requests to the dev server.
#[derive(Debug, Error)]
pub enum AssetProxyError {
    #[error("Webpack not running")]
    NotRunning,
    #[error("Serving asset timed out")]
    DeadlineExceeded,
    #[error("Asset not found")]
    UpstreamStatus { status: u16 },
    #[error("failed to reach the dev server: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
}

/// Failure reasons for Node toolchain validation.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("`{name}` was not found on PATH")]
    BinaryMissing { name: &'static str },
    #[error("webpack is not installed under {root} and npx is unavailable")]
    WebpackUnavailable { root: PathBuf },
    #[error("node_modules is missing at {path}")]
    NodeModulesMissing { path: PathBuf },
    #[error("Insufficient free space for a webpack build (available={available_bytes} bytes)")]
    DiskInsufficient { available_bytes: u64 },
    #[error("Internal toolchain probe error: {message}")]
    Internal { message: String },
}

/// Errors occurring while operating on build history directories.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O failed for file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to delete history entry {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<HistoryError> for WebpackBuildError {
    fn from(value: HistoryError) -> Self {
        WebpackBuildError::HistoryFailure {
            message: value.to_string(),
        }
    }
}

/// Structured failure metadata reported by CLI commands and the runtime.
#[derive(Debug, Clone, Serialize)]
pub struct FailureDescriptor {
    /// Error code.
    pub code: &'static str,
    /// User-facing message.
    pub message: &'static str,
    /// Recommended remediation.
    pub remediation: &'static str,
}

impl FailureDescriptor {
    /// Simple constructor.
    pub const fn new(code: &'static str, message: &'static str, remediation: &'static str) -> Self {
        Self {
            code,
            message,
            remediation,
        }
    }

    /// Create a builder.
    pub fn builder(&self) -> FailureReportBuilder<'_> {
        FailureReportBuilder::new(self)
    }
}

/// Builder for failure reports that fails if required fields are missing.
pub struct FailureReportBuilder<'a> {
    descriptor: &'a FailureDescriptor,
    retryable: Option<bool>,
    details: Option<Value>,
    extra_fields: Map<String, Value>,
}

impl<'a> FailureReportBuilder<'a> {
    pub fn new(descriptor: &'a FailureDescriptor) -> Self {
        Self {
            descriptor,
            retryable: None,
            details: None,
            extra_fields: Map::new(),
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_context_field(mut self, key: &str, value: Value) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }

    pub fn with_exit_code_value(mut self, exit_code: u8) -> Self {
        let numeric = Number::from(exit_code);
        self.extra_fields
            .insert("exit_code".into(), Value::Number(numeric));
        self
    }

    pub fn build(self) -> Result<Value, FailureReportBuilderError> {
        if self.descriptor.remediation.trim().is_empty() {
            return Err(FailureReportBuilderError::MissingRemediation {
                code: self.descriptor.code,
            });
        }
        let retryable = self
            .retryable
            .ok_or(FailureReportBuilderError::MissingRetryable {
                code: self.descriptor.code,
            })?;

        let mut data = Map::new();
        data.insert("code".into(), Value::String(self.descriptor.code.into()));
        data.insert(
            "message".into(),
            Value::String(self.descriptor.message.into()),
        );
        data.insert(
            "remediation".into(),
            Value::String(self.descriptor.remediation.into()),
        );
        data.insert("retryable".into(), Value::Bool(retryable));
        if let Some(details) = self.details {
            data.insert("details".into(), details);
        }
        for (key, value) in self.extra_fields {
            data.insert(key, value);
        }

        Ok(Value::Object(data))
    }
}

/// Errors when required builder fields are missing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FailureReportBuilderError {
    #[error("retryable is missing (code={code})")]
    MissingRetryable { code: &'static str },
    #[error("remediation is empty (code={code})")]
    MissingRemediation { code: &'static str },
}
