#[path = "integration/common.rs"]
mod common;

#[path = "integration/record_shape.rs"]
mod record_shape;

#[path = "integration/devserver_lifecycle.rs"]
mod devserver_lifecycle;

#[path = "integration/asset_proxy.rs"]
mod asset_proxy;

#[path = "integration/build_jobs.rs"]
mod build_jobs;

#[path = "integration/cli_commands.rs"]
mod cli_commands;
