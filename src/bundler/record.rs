//! The bundler configuration record handed, unmodified, to webpack.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::lib::errors::ConfigError;

/// Directory segment under the project root that receives build output.
pub const DIST_DIR: &str = "dist";
/// Entry module compiled when none is configured.
pub const DEFAULT_ENTRY: &str = "./index.js";
/// Bundle filename emitted when none is configured.
pub const DEFAULT_BUNDLE_FILENAME: &str = "app.bundle.js";
/// Dev-server port used when none is configured.
pub const DEFAULT_DEV_SERVER_PORT: u16 = 9381;

/// Build mode understood by webpack.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    /// `NODE_ENV` value matching this mode.
    pub fn node_env(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output location settings of the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputSettings {
    pub path: PathBuf,
    pub filename: String,
}

/// Dev-server settings of the record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DevServerSettings {
    pub port: u16,
}

/// Field values resolved from configuration before the record is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSettings {
    pub mode: Mode,
    pub entry: String,
    pub filename: String,
    pub port: u16,
}

impl Default for RecordSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Development,
            entry: DEFAULT_ENTRY.to_string(),
            filename: DEFAULT_BUNDLE_FILENAME.to_string(),
            port: DEFAULT_DEV_SERVER_PORT,
        }
    }
}

/// The configuration record consumed by the external bundler.
///
/// Immutable once constructed; the serialized shape matches the schema
/// webpack expects (`mode`, `entry`, `output.path`, `output.filename`,
/// `devServer.port`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebpackConfig {
    pub mode: Mode,
    pub entry: String,
    pub output: OutputSettings,
    pub dev_server: DevServerSettings,
}

impl WebpackConfig {
    /// Construct the record from a project root directory using default field values.
    pub fn from_root(root: &Path) -> Result<Self, ConfigError> {
        Self::from_root_with(root, &RecordSettings::default())
    }

    /// Construct the record from a project root directory and resolved field values.
    ///
    /// The root is canonicalized; an unresolvable root is the only failure.
    /// The output path is always `<root>/dist`.
    pub fn from_root_with(root: &Path, settings: &RecordSettings) -> Result<Self, ConfigError> {
        let resolved_root = root.canonicalize().map_err(|source| ConfigError::RootDir {
            path: root.to_path_buf(),
            source,
        })?;

        Ok(Self {
            mode: settings.mode,
            entry: settings.entry.clone(),
            output: OutputSettings {
                path: resolved_root.join(DIST_DIR),
                filename: settings.filename.clone(),
            },
            dev_server: DevServerSettings {
                port: settings.port,
            },
        })
    }

    /// Absolute path of the bundle webpack emits for this record.
    pub fn bundle_path(&self) -> PathBuf {
        self.output.path.join(&self.output.filename)
    }

    /// Render the record as a CommonJS `webpack.config.js` module.
    ///
    /// The output path is rendered as `path.resolve(__dirname, 'dist')` so the
    /// generated file stays valid when the project directory moves.
    pub fn render_config_js(&self) -> String {
        format!(
            r#"const path = require('path');

module.exports = {{
  mode: '{mode}',
  entry: '{entry}',
  output: {{
    path: path.resolve(__dirname, '{dist}'),
    filename: '{filename}',
  }},
  devServer: {{
    port: {port},
  }},
}};
"#,
            mode = self.mode,
            entry = escape_js_single_quoted(&self.entry),
            dist = DIST_DIR,
            filename = escape_js_single_quoted(&self.output.filename),
            port = self.dev_server.port,
        )
    }
}

fn escape_js_single_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
