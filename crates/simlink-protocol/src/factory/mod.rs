//! Reconstructs concrete commands and results from wire payloads.
//!
//! Payload text is decoded into a [`FieldMap`] first; the concrete type is
//! then resolved from `CmdName`, through the plugin namespace named by
//! `CmdTargetId` when present. The decoded fields are attached to the
//! resolved type as-is, so identity fields always survive the round trip.

use tracing::debug;

use crate::error::ProtocolError;
use crate::model::{
    Command, CommandResult, FieldMap, FieldValue, NAME_KEY, RELATED_COMMAND_KEY, TARGET_ID_KEY,
};
use crate::registry::CommandLookup;

/// Builds commands and results through a [`CommandLookup`].
#[derive(Debug, Clone)]
pub struct CommandFactory<L> {
    lookup: L,
}

impl<L> CommandFactory<L> {
    /// Creates a factory resolving through `lookup`.
    #[must_use]
    pub const fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// Borrows the lookup.
    #[must_use]
    pub const fn lookup(&self) -> &L {
        &self.lookup
    }
}

impl<L: CommandLookup> CommandFactory<L> {
    /// Decodes a command payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] for malformed JSON or a missing
    /// `CmdName`, and [`ProtocolError::Resolution`] when no registered type
    /// carries the name.
    pub fn create_command(&self, text: &str) -> Result<Command, ProtocolError> {
        self.command_from_fields(FieldMap::from_json(text)?)
    }

    /// Decodes a result payload and the command it answers.
    ///
    /// The related command may arrive as an encoded JSON string or as an
    /// inline object.
    ///
    /// # Errors
    ///
    /// As for [`CommandFactory::create_command`], plus
    /// [`ProtocolError::Parse`] when the resolved type is not a result or the
    /// related command is missing.
    pub fn create_result(&self, text: &str) -> Result<CommandResult, ProtocolError> {
        let command = self.create_command(text)?;
        let is_result = command
            .descriptor()
            .is_some_and(|descriptor| descriptor.kind().is_result());
        if !is_result {
            return Err(ProtocolError::parse(format!(
                "'{}' is not a result type",
                command.name()
            )));
        }

        let related = match command.get(RELATED_COMMAND_KEY) {
            Some(FieldValue::String(encoded)) => self.create_command(encoded)?,
            Some(FieldValue::Map(fields)) => self.command_from_fields(fields.clone())?,
            Some(_) => {
                return Err(ProtocolError::parse(format!(
                    "'{RELATED_COMMAND_KEY}' of '{}' is neither a string nor an object",
                    command.name()
                )));
            }
            None => {
                return Err(ProtocolError::parse(format!(
                    "result '{}' has no '{RELATED_COMMAND_KEY}'",
                    command.name()
                )));
            }
        };
        Ok(CommandResult::new(command, related))
    }

    fn command_from_fields(&self, fields: FieldMap) -> Result<Command, ProtocolError> {
        let name = fields
            .get(NAME_KEY)
            .and_then(FieldValue::as_str)
            .ok_or_else(|| ProtocolError::parse(format!("payload has no '{NAME_KEY}'")))?;
        let target_id = fields.get(TARGET_ID_KEY).and_then(FieldValue::as_str);
        let Some(descriptor) = self.lookup.resolve(name, target_id) else {
            debug!(target: "simlink::factory", name, ?target_id, "unresolved command name");
            return Err(ProtocolError::Resolution {
                name: name.to_owned(),
                target_id: target_id.map(str::to_owned),
            });
        };
        Ok(Command::from_fields(fields).with_descriptor(descriptor))
    }
}

#[cfg(test)]
mod tests;
