use std::path::Path;

use serde::Deserialize;

use crate::bundler::record::{Mode, RecordSettings, DEFAULT_BUNDLE_FILENAME, DEFAULT_ENTRY};
use crate::lib::errors::ConfigError;
use crate::lib::paths::is_plain_relative;

/// Bundle record settings.
#[derive(Debug, Clone)]
pub struct BundleSection {
    pub mode: Mode,
    pub entry: String,
    pub filename: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawBundleSection {
    pub mode: Option<String>,
    pub entry: Option<String>,
    pub filename: Option<String>,
}

impl BundleSection {
    /// Record settings paired with the configured dev-server port.
    pub fn record_settings(&self, port: u16) -> RecordSettings {
        RecordSettings {
            mode: self.mode,
            entry: self.entry.clone(),
            filename: self.filename.clone(),
            port,
        }
    }
}

pub fn parse_bundle_section(
    raw: Option<RawBundleSection>,
    path: &Path,
) -> Result<BundleSection, ConfigError> {
    let bundle_raw = raw.unwrap_or_default();

    let mode = match bundle_raw.mode {
        Some(value) => parse_mode(&value, path)?,
        None => Mode::default(),
    };

    let entry = bundle_raw.entry.unwrap_or_else(|| DEFAULT_ENTRY.to_string());
    validate_bundle_path(&entry, "bundle.entry", path)?;

    let filename = bundle_raw
        .filename
        .unwrap_or_else(|| DEFAULT_BUNDLE_FILENAME.to_string());
    validate_bundle_path(&filename, "bundle.filename", path)?;

    Ok(BundleSection {
        mode,
        entry,
        filename,
    })
}

fn parse_mode(value: &str, path: &Path) -> Result<Mode, ConfigError> {
    match value {
        "development" => Ok(Mode::Development),
        "production" => Ok(Mode::Production),
        _ => Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "bundle.mode",
            message: format!("Unknown mode {value}; use development or production"),
        }),
    }
}

fn validate_bundle_path(value: &str, field: &'static str, path: &Path) -> Result<(), ConfigError> {
    if is_plain_relative(Path::new(value)) {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field,
        message: format!("Use a relative path without parent traversal: {value}"),
    })
}
