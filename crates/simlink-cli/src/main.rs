//! CLI entrypoint for the simlink client.
//!
//! The binary delegates to [`simlink_cli::run`], which loads configuration,
//! connects to the simulation server, and prints command results.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    simlink_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
