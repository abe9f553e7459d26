//! CLI argument definitions and `LaunchProfile` construction.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::bundler::Mode;

use super::{
    build_launch_args, resolve_config_path, resolve_project_root, validate_listen_port,
    LaunchProfile, DEFAULT_LISTEN_PORT,
};

/// Parsed command intent from CLI.
#[derive(Debug, Clone)]
pub enum ParsedCommand {
    RunSidecar(LaunchProfile),
    Cli(CliInvocation),
}

/// A one-shot command plus the resolved paths it operates on.
#[derive(Debug, Clone)]
pub struct CliInvocation {
    pub config_path: Option<PathBuf>,
    pub project_root: PathBuf,
    pub command: UtilityCommand,
}

/// One-shot commands that skip the HTTP runtime.
#[derive(Debug, Clone)]
pub enum UtilityCommand {
    Build(BuildArgs),
    Doctor,
    Config(ConfigCommand),
}

/// Top-level CLI subcommands. Without one the sidecar serves with defaults.
#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Supervise the dev server and serve assets over HTTP.
    Serve(ServeArgs),
    /// Run a single webpack build and print the job report.
    Build(BuildArgs),
    /// Check the local Node toolchain and report per-check results.
    Doctor,
    /// Inspect or write the generated webpack configuration.
    Config(ConfigArgs),
}

/// Arguments for `serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Port the sidecar listens on.
    #[arg(long = "port", default_value_t = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,
    /// Override the configured dev-server port for this run.
    #[arg(long = "devserver-port")]
    pub devserver_port: Option<u16>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            devserver_port: None,
        }
    }
}

/// Arguments for `build`.
#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// Build mode override; the configured mode applies when omitted.
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,
}

/// `config` command container.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Operations on the generated configuration record.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration record as JSON.
    Print,
    /// Write webpack.config.js into the project root.
    Emit(ConfigEmitArgs),
}

/// Arguments for `config emit`.
#[derive(Debug, Clone, Args)]
pub struct ConfigEmitArgs {
    /// Overwrite an existing webpack.config.js.
    #[arg(long, default_value_t = false)]
    pub force: bool,
    /// Show the planned write without touching files.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Webpack sidecar (dev-server supervisor, asset proxy, build runner)",
    long_about = None
)]
pub struct LaunchProfileArgs {
    /// Path to sidecar.toml (overrides SIDECAR_CONFIG_PATH).
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config_override: Option<PathBuf>,
    /// Webpack project root (defaults to the working directory).
    #[arg(long = "root", global = true, value_name = "DIR")]
    pub root_override: Option<PathBuf>,
    /// Optional CLI command mode.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

impl LaunchProfileArgs {
    /// Parse CLI args into either sidecar launch mode or utility command mode.
    pub fn into_command(self) -> Result<ParsedCommand> {
        let Self {
            config_override,
            root_override,
            command,
        } = self;

        match command {
            None => Ok(ParsedCommand::RunSidecar(build_profile(
                config_override,
                root_override,
                ServeArgs::default(),
            )?)),
            Some(CliCommand::Serve(serve)) => Ok(ParsedCommand::RunSidecar(build_profile(
                config_override,
                root_override,
                serve,
            )?)),
            Some(CliCommand::Build(build)) => Ok(ParsedCommand::Cli(build_invocation(
                config_override,
                root_override,
                UtilityCommand::Build(build),
            )?)),
            Some(CliCommand::Doctor) => Ok(ParsedCommand::Cli(build_invocation(
                config_override,
                root_override,
                UtilityCommand::Doctor,
            )?)),
            Some(CliCommand::Config(config)) => Ok(ParsedCommand::Cli(build_invocation(
                config_override,
                root_override,
                UtilityCommand::Config(config.command),
            )?)),
        }
    }
}

/// Build a `LaunchProfile` from CLI args and environment variables.
fn build_profile(
    config_override: Option<PathBuf>,
    root_override: Option<PathBuf>,
    serve: ServeArgs,
) -> Result<LaunchProfile> {
    let config_path = resolve_config_path(config_override)?;
    let project_root = resolve_project_root(root_override)?;
    let listen_port = validate_listen_port(serve.listen_port)?;
    let launch_args = build_launch_args(listen_port, &project_root, config_path.as_deref());

    Ok(LaunchProfile {
        config_path,
        project_root,
        listen_port,
        devserver_port_override: serve.devserver_port,
        launch_args,
    })
}

fn build_invocation(
    config_override: Option<PathBuf>,
    root_override: Option<PathBuf>,
    command: UtilityCommand,
) -> Result<CliInvocation> {
    Ok(CliInvocation {
        config_path: resolve_config_path(config_override)?,
        project_root: resolve_project_root(root_override)?,
        command,
    })
}
