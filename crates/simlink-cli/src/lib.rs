//! Command-line runtime for the simlink client.
//!
//! The runtime parses arguments, loads layered configuration, installs
//! telemetry, and drives one [`Session`] per invocation. Output streams and
//! the configuration loader are injectable so tests can run the whole flow
//! against an in-process fake server.

use std::ffi::OsString;
use std::fmt::Display;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use simlink_config::Config;
use simlink_protocol::commands::{GetSimulatorState, SimulatorStateResult};
use simlink_protocol::model::{NAME_KEY, TARGET_ID_KEY, UUID_KEY};
use simlink_protocol::{
    Command, CommandLookup, CommandRegistry, CommandResult, FieldMap, FieldValue, ProtocolError,
    Session, TypedCommand,
};
use tracing::{debug, warn};

mod cli;
mod config;
mod errors;
mod telemetry;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
pub(crate) use errors::AppError;

/// Exit code reported when the server answers with a failure result.
const COMMAND_FAILED: u8 = 2;

enum Action {
    Version,
    Send(Command),
    Status,
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(stdout: &'a mut W, stderr: &'a mut E, loader: &'a L) -> Self {
        Self {
            stdout,
            stderr,
            loader,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);

        let cli = match Cli::try_parse_from(command_arguments(&args, &split)) {
            Ok(cli) => cli,
            // Help and version requests are not failures.
            Err(error) if !error.use_stderr() => {
                emit(&mut *self.stdout, error.render());
                return ExitCode::SUCCESS;
            }
            Err(error) => {
                emit(&mut *self.stderr, AppError::CliUsage(error));
                return ExitCode::FAILURE;
            }
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| self.execute(&cli.command, &config));

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => {
                emit(&mut *self.stderr, error);
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, command: &CliCommand, config: &Config) -> Result<ExitCode, AppError> {
        telemetry::initialise(config)?;
        let registry = CommandRegistry::with_core_commands();
        // Reject malformed commands before touching the network.
        let action = match command {
            CliCommand::Version => Action::Version,
            CliCommand::Send { command: json } => Action::Send(command_from_json(json, &registry)?),
            CliCommand::Status => Action::Status,
        };

        let mut session = Session::connect(config, registry)?;
        let server_version = session.negotiate_version()?;
        if server_version != session.client_version() {
            warn!(
                target: "simlink::cli",
                client = session.client_version(),
                server = server_version,
                "server API version differs from the client"
            );
        }

        let exit_code = match action {
            Action::Version => {
                let line = format!(
                    "client API version {}, server API version {server_version}",
                    session.client_version()
                );
                self.print(&line)?;
                ExitCode::SUCCESS
            }
            Action::Send(outgoing) => {
                let result = session.call(&outgoing)?;
                self.report(result)?
            }
            Action::Status => {
                let result = session.call(GetSimulatorState::new().command())?;
                self.report_state(result)?
            }
        };

        if let Err(error) = session.close() {
            debug!(target: "simlink::cli", %error, "failed to close session");
        }
        Ok(exit_code)
    }

    fn report(&mut self, result: CommandResult) -> Result<ExitCode, AppError> {
        match result.ensure_success() {
            Ok(result) => {
                self.print(&result.message())?;
                Ok(ExitCode::SUCCESS)
            }
            Err(failed) => {
                emit(&mut *self.stderr, failed);
                Ok(ExitCode::from(COMMAND_FAILED))
            }
        }
    }

    fn report_state(&mut self, result: CommandResult) -> Result<ExitCode, AppError> {
        let Some(state) = result.downcast::<SimulatorStateResult>() else {
            return self.report(result);
        };
        let line = match (state.state(), state.state_id()) {
            (Some(name), Some(id)) => format!("State: {name} ({id})"),
            (Some(name), None) => format!("State: {name}"),
            (None, _) => result.message(),
        };
        self.print(&line)?;
        Ok(ExitCode::SUCCESS)
    }

    fn print(&mut self, line: &str) -> Result<(), AppError> {
        writeln!(self.stdout, "{line}").map_err(AppError::Output)
    }
}

/// Builds a fresh command from a JSON field map.
///
/// `CmdName` and the optional `CmdTargetId` select the type; a new UUID is
/// assigned and any `CmdUuid` in the input is ignored. The type must be
/// known locally so its result can be decoded.
fn command_from_json(text: &str, registry: &CommandRegistry) -> Result<Command, AppError> {
    let fields = FieldMap::from_json(text)?;
    let name = fields
        .get(NAME_KEY)
        .and_then(FieldValue::as_str)
        .ok_or(AppError::MissingCommandName)?;
    let target_id = fields.get(TARGET_ID_KEY).and_then(FieldValue::as_str);
    let descriptor = registry
        .resolve(name, target_id)
        .ok_or_else(|| ProtocolError::Resolution {
            name: name.to_owned(),
            target_id: target_id.map(str::to_owned),
        })?;

    let mut command = Command::from_descriptor(descriptor);
    for (key, value) in fields
        .iter()
        .filter(|(key, _)| ![NAME_KEY, UUID_KEY, TARGET_ID_KEY].contains(key))
    {
        command.set(key, value.clone());
    }
    Ok(command)
}

fn emit(writer: &mut impl Write, message: impl Display) {
    if let Err(error) = writeln!(writer, "{message}") {
        debug!(target: "simlink::cli", %error, "failed to write diagnostic");
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(stdout, stderr, loader).run(args)
}
