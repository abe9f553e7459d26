use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_MAX_BUILD_MINUTES: u16 = 10;
pub const DEFAULT_JOB_TTL_SECS: u32 = 600;
pub const DEFAULT_CLEANUP_SCHEDULE_SECS: u32 = 60;

/// One-shot build limits and job retention.
#[derive(Debug, Clone)]
pub struct BuildSection {
    pub max_build_minutes: u16,
    pub job_ttl_secs: u32,
    pub cleanup_schedule_secs: u32,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawBuildSection {
    pub max_build_minutes: Option<u16>,
    pub job_ttl_secs: Option<u32>,
    pub cleanup_schedule_secs: Option<u32>,
}

impl BuildSection {
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.max_build_minutes) * 60)
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.job_ttl_secs))
    }

    pub fn cleanup_schedule(&self) -> Duration {
        Duration::from_secs(u64::from(self.cleanup_schedule_secs))
    }
}

pub fn parse_build_section(
    raw: Option<RawBuildSection>,
    path: &Path,
) -> Result<BuildSection, ConfigError> {
    let build_raw = raw.unwrap_or_default();

    let max_build_minutes = build_raw
        .max_build_minutes
        .unwrap_or(DEFAULT_MAX_BUILD_MINUTES);
    validate_build_minutes(max_build_minutes, path)?;

    let job_ttl_secs = build_raw.job_ttl_secs.unwrap_or(DEFAULT_JOB_TTL_SECS);
    validate_ttl_secs(job_ttl_secs, path)?;

    let cleanup_schedule_secs = build_raw
        .cleanup_schedule_secs
        .unwrap_or(DEFAULT_CLEANUP_SCHEDULE_SECS);
    validate_cleanup_interval(cleanup_schedule_secs, path)?;

    Ok(BuildSection {
        max_build_minutes,
        job_ttl_secs,
        cleanup_schedule_secs,
    })
}

fn validate_build_minutes(minutes: u16, path: &Path) -> Result<(), ConfigError> {
    if (1..=120).contains(&minutes) {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "build.max_build_minutes",
        message: "Specify a value between 1 and 120 minutes".into(),
    })
}

fn validate_ttl_secs(ttl: u32, path: &Path) -> Result<(), ConfigError> {
    if (60..=3600).contains(&ttl) {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "build.job_ttl_secs",
        message: "Specify a value between 60 and 3600 seconds".into(),
    })
}

fn validate_cleanup_interval(interval: u32, path: &Path) -> Result<(), ConfigError> {
    if (30..=1800).contains(&interval) {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "build.cleanup_schedule_secs",
        message: "Specify a value between 30 and 1800 seconds".into(),
    })
}
