//! Entry point for the webpack sidecar.
use std::process::ExitCode;

use anyhow::Error;
use clap::Parser;
use webpack_sidecar::{
    cli::{self, execute_cli_command, CliInvocation, LaunchProfileArgs, ParsedCommand},
    lib::telemetry,
    server::runtime::{self, RuntimeExit},
};

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(code) => code,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<ExitCode, RuntimeExit> {
    telemetry::init_tracing().map_err(RuntimeExit::from_error)?;
    let args = LaunchProfileArgs::parse();
    let command = args.into_command().map_err(RuntimeExit::from_error)?;

    match command {
        ParsedCommand::RunSidecar(profile) => {
            run_sidecar(profile).await?;
            Ok(ExitCode::SUCCESS)
        }
        ParsedCommand::Cli(invocation) => handle_cli_command(invocation).await,
    }
}

async fn run_sidecar(profile: webpack_sidecar::cli::LaunchProfile) -> Result<(), RuntimeExit> {
    let config = cli::load_sidecar_config(profile.config_path.as_deref())
        .map_err(|err| RuntimeExit::from_error(Error::new(err)))?;
    runtime::run_server(profile, config).await
}

async fn handle_cli_command(invocation: CliInvocation) -> Result<ExitCode, RuntimeExit> {
    let output = execute_cli_command(invocation).await?;
    println!("{payload}", payload = output.payload);
    Ok(output.exit_code)
}
