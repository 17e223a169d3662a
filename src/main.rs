mod auth;
mod cli;
mod config;
mod error;
mod output;
mod providers;
mod watch;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();
    info!("Starting gitlabctl {}", env!("CARGO_PKG_VERSION"));
    cli.execute().await
}
