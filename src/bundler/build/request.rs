use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bundler::record::Mode;

const MAX_EXTRA_ARGS: usize = 5;
const MAX_EXTRA_ARG_LEN: usize = 64;

/// webpack-cli flags allowed in `extra_args`.
pub const ALLOWED_EXTRA_ARGS: &[&str] = &[
    "--progress",
    "--profile",
    "--no-color",
    "--no-stats",
    "--fail-on-warnings",
];

/// Environment variables allowed in `env_overrides`.
pub const ALLOWED_ENV_OVERRIDES: &[&str] =
    &["NODE_OPTIONS", "NO_COLOR", "CI", "MOCK_WEBPACK_BEHAVIOR"];

/// Input for a one-shot bundle build.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BundleBuildRequest {
    /// Overrides the configured mode when set.
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub env_overrides: BTreeMap<String, String>,
}

impl BundleBuildRequest {
    /// Validate the input against the webpack-cli allowlists.
    pub fn validate(&self) -> Result<(), BuildRequestValidationError> {
        if self.extra_args.len() > MAX_EXTRA_ARGS {
            return Err(BuildRequestValidationError::TooManyExtraArgs {
                count: self.extra_args.len(),
            });
        }
        for arg in &self.extra_args {
            if arg.len() > MAX_EXTRA_ARG_LEN {
                return Err(BuildRequestValidationError::ExtraArgTooLong {
                    arg: arg.clone(),
                    length: arg.len(),
                });
            }
            if !ALLOWED_EXTRA_ARGS.contains(&arg.as_str()) {
                return Err(BuildRequestValidationError::ExtraArgNotAllowed { arg: arg.clone() });
            }
        }

        for key in self.env_overrides.keys() {
            if !ALLOWED_ENV_OVERRIDES.contains(&key.as_str()) {
                return Err(BuildRequestValidationError::EnvOverrideNotAllowed {
                    key: key.clone(),
                });
            }
        }

        Ok(())
    }

    /// Mode the build runs in, falling back to the configured one.
    pub fn effective_mode(&self, configured: Mode) -> Mode {
        self.mode.unwrap_or(configured)
    }
}

/// Input validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildRequestValidationError {
    #[error("extra_args contains a disallowed value `{arg}`")]
    ExtraArgNotAllowed { arg: String },
    #[error("extra_args exceeds the allowed count (count={count})")]
    TooManyExtraArgs { count: usize },
    #[error("extra_args `{arg}` is too long ({length} characters)")]
    ExtraArgTooLong { arg: String, length: usize },
    #[error("env_overrides `{key}` is not permitted")]
    EnvOverrideNotAllowed { key: String },
}
