//! Command-line argument definitions for the simlink client.

use clap::{Parser, Subcommand};

/// Drives a simulation server from the command line.
///
/// Configuration flags such as `--server` must precede the subcommand.
#[derive(Parser, Debug)]
#[command(name = "simlink", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations offered by the client.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Negotiates and prints the client and server API versions.
    Version,
    /// Sends one command given as a JSON field map and prints its result.
    Send {
        /// Fields of the command; `CmdName` is required.
        #[arg(value_name = "JSON")]
        command: String,
    },
    /// Queries and prints the simulator state.
    Status,
}
