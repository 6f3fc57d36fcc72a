//! CLI command definitions and dispatch.

pub mod stop;

use clap::{Parser, Subcommand};

use tracelet_common::constants::BIN_NAME;

/// Tracelet — dynamic instrumentation for hosts and containers.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stop instrumenting all processes and services, host-wide and in all
    /// relevant containers.
    Stop(stop::StopArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Stop(args) => stop::execute(args),
    }
}
