//! Results: commands that answer an earlier command.

use std::fmt;

use thiserror::Error;

use super::command::{Command, NAME_KEY, UUID_KEY, render_fields};
use super::descriptor::CommandKind;
use crate::commands::TypedCommand;

/// Field holding the command a result answers.
pub const RELATED_COMMAND_KEY: &str = "RelatedCommand";
/// Field holding the failure text on failure results.
pub const ERROR_MSG_KEY: &str = "ErrorMsg";

const SUCCESS_RESULT_NAME: &str = "SuccessResult";

/// A decoded result together with the command it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    command: Command,
    related: Command,
}

impl CommandResult {
    /// Pairs a result command with its reconstructed related command.
    #[must_use]
    pub const fn new(command: Command, related: Command) -> Self {
        Self { command, related }
    }

    /// Returns `true` unless the result type is a failure variant.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.command
            .descriptor()
            .is_none_or(|descriptor| descriptor.kind() != CommandKind::Failure)
    }

    /// Failure text carried by failure results.
    #[must_use]
    pub fn error_msg(&self) -> Option<&str> {
        if self.is_success() {
            return None;
        }
        self.command.get_str(ERROR_MSG_KEY)
    }

    /// Human-readable outcome.
    ///
    /// Failures yield their error message, the plain success result yields
    /// `"Success"`, and any other result renders its fields.
    #[must_use]
    pub fn message(&self) -> String {
        if let Some(error) = self.error_msg() {
            return error.to_owned();
        }
        if self.is_success() && self.command.name() == SUCCESS_RESULT_NAME {
            return "Success".to_owned();
        }
        self.to_string()
    }

    /// The command this result answers.
    #[must_use]
    pub const fn related_command(&self) -> &Command {
        &self.related
    }

    /// The result itself as a generic command.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.command
    }

    /// Name of the concrete result type.
    #[must_use]
    pub fn name(&self) -> &str {
        self.command.name()
    }

    /// Typed view of the result when its name matches `T`.
    #[must_use]
    pub fn downcast<T: TypedCommand>(&self) -> Option<T> {
        (self.command.name() == T::DESCRIPTOR.name())
            .then(|| T::from_command(self.command.clone()))
    }

    /// Converts a failure result into an error.
    ///
    /// # Errors
    ///
    /// Returns [`CommandFailed`] when the result is a failure variant.
    pub fn ensure_success(self) -> Result<Self, CommandFailed> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(CommandFailed::new(self))
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_fields(
            formatter,
            self.command.name(),
            self.command.fields(),
            &[NAME_KEY, UUID_KEY, RELATED_COMMAND_KEY],
        )
    }
}

/// A failure result surfaced as an error.
///
/// An optional simulation error message, such as the simulator's own account
/// of why it stopped, is appended verbatim to the rendered message.
#[derive(Debug, Clone, Error)]
#[error("{related} failed: {message}{}", .simulation_error.as_deref().unwrap_or_default())]
pub struct CommandFailed {
    related: String,
    message: String,
    simulation_error: Option<String>,
    result: Box<CommandResult>,
}

impl CommandFailed {
    fn new(result: CommandResult) -> Self {
        Self {
            related: result.related_command().name().to_owned(),
            message: result.message(),
            simulation_error: None,
            result: Box::new(result),
        }
    }

    /// Attaches the simulation error message reported alongside the failure.
    #[must_use]
    pub fn with_simulation_error(mut self, message: impl Into<String>) -> Self {
        self.simulation_error = Some(message.into());
        self
    }

    /// The simulation error message, when one was attached.
    #[must_use]
    pub fn simulation_error(&self) -> Option<&str> {
        self.simulation_error.as_deref()
    }

    /// The failure result that caused the error.
    #[must_use]
    pub fn result(&self) -> &CommandResult {
        &self.result
    }

    /// Consumes the error, returning the failure result.
    #[must_use]
    pub fn into_result(self) -> CommandResult {
        *self.result
    }
}
