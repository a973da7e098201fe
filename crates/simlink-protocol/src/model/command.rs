//! The generic command: a field map with reserved identity fields.

use std::fmt;

use time::PrimitiveDateTime;
use tracing::warn;
use uuid::Uuid;

use super::descriptor::{CommandDescriptor, ExecutePermission};
use super::value::{FieldMap, FieldValue};
use crate::error::ProtocolError;

/// Field holding the concrete type name.
pub const NAME_KEY: &str = "CmdName";
/// Field holding the braced textual UUID.
pub const UUID_KEY: &str = "CmdUuid";
/// Optional field holding the command timestamp.
pub const TIMESTAMP_KEY: &str = "CmdTimestamp";
/// Optional field holding the dotted plugin namespace path.
pub const TARGET_ID_KEY: &str = "CmdTargetId";

/// A named, UUID-identified request carried as an ordered field map.
///
/// Caller-built commands get a fresh identity from [`Command::new`]; commands
/// decoded from the wire keep the identity they arrived with
/// ([`Command::from_fields`]). `CmdName` and `CmdUuid` are never rewritten
/// after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    fields: FieldMap,
    descriptor: Option<CommandDescriptor>,
}

impl Command {
    /// Creates a core command with a fresh UUID.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut fields = FieldMap::new();
        fields.insert(NAME_KEY, FieldValue::String(name.into()));
        fields.insert(UUID_KEY, fresh_uuid());
        Self {
            fields,
            descriptor: None,
        }
    }

    /// Creates a plugin command with a fresh UUID.
    #[must_use]
    pub fn with_target(name: impl Into<String>, target_id: impl Into<String>) -> Self {
        let mut command = Self::new(name);
        command
            .fields
            .insert(TARGET_ID_KEY, FieldValue::String(target_id.into()));
        command
    }

    /// Creates a fresh command for a registered type.
    #[must_use]
    pub fn from_descriptor(descriptor: CommandDescriptor) -> Self {
        let command = match descriptor.target_id() {
            Some(target_id) => Self::with_target(descriptor.name(), target_id),
            None => Self::new(descriptor.name()),
        };
        command.with_descriptor(descriptor)
    }

    /// Wraps already-decoded fields without generating any identity.
    #[must_use]
    pub const fn from_fields(fields: FieldMap) -> Self {
        Self {
            fields,
            descriptor: None,
        }
    }

    /// Attaches the resolved type metadata.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: CommandDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Concrete type name, or an empty string when the field is missing.
    #[must_use]
    pub fn name(&self) -> &str {
        self.get_str(NAME_KEY).unwrap_or_default()
    }

    /// Correlation UUID, or an empty string when the field is missing.
    #[must_use]
    pub fn uuid(&self) -> &str {
        self.get_str(UUID_KEY).unwrap_or_default()
    }

    /// Dotted plugin namespace path.
    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        self.get_str(TARGET_ID_KEY)
    }

    /// Command timestamp, when set.
    #[must_use]
    pub fn timestamp(&self) -> Option<PrimitiveDateTime> {
        self.fields.get(TIMESTAMP_KEY).and_then(FieldValue::as_date_time)
    }

    /// Sets the command timestamp.
    pub fn set_timestamp(&mut self, timestamp: PrimitiveDateTime) {
        self.fields.insert(TIMESTAMP_KEY, timestamp);
    }

    /// Reads a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Reads a string field.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FieldValue::as_str)
    }

    /// Writes a payload field.
    ///
    /// `CmdName` and `CmdUuid` are fixed at construction; writes to them are
    /// ignored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        let name: String = key.into();
        if name == NAME_KEY || name == UUID_KEY {
            warn!(target: "simlink::model", field = %name, "ignoring write to identity field");
            return self;
        }
        self.fields.insert(name, value);
        self
    }

    /// All fields, including reserved ones.
    #[must_use]
    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Consumes the command, returning its fields.
    #[must_use]
    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    /// Type metadata resolved by the factory or attached at construction.
    #[must_use]
    pub const fn descriptor(&self) -> Option<&CommandDescriptor> {
        self.descriptor.as_ref()
    }

    /// States in which the server may run this command.
    ///
    /// Types without metadata default to [`ExecutePermission::EXECUTE_IF_IDLE`].
    #[must_use]
    pub fn execute_permission(&self) -> ExecutePermission {
        self.descriptor
            .map(|descriptor| descriptor.permission())
            .unwrap_or_default()
    }

    /// Returns `true` when every flag in `flags` is permitted.
    #[must_use]
    pub fn has_execute_permission(&self, flags: ExecutePermission) -> bool {
        self.execute_permission().contains(flags)
    }

    /// Deprecation note for the concrete type, if any.
    #[must_use]
    pub fn deprecated(&self) -> Option<&'static str> {
        self.descriptor.and_then(|descriptor| descriptor.deprecated())
    }

    /// Encodes the command as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        self.fields.to_json()
    }
}

/// Nests a command, identity fields included, as a map payload value.
impl From<Command> for FieldValue {
    fn from(command: Command) -> Self {
        Self::Map(command.into_fields())
    }
}

fn fresh_uuid() -> String {
    Uuid::new_v4().braced().to_string()
}

/// Writes `Name(key: value, ...)`, skipping `hidden` keys.
pub(crate) fn render_fields(
    formatter: &mut fmt::Formatter<'_>,
    name: &str,
    fields: &FieldMap,
    hidden: &[&str],
) -> fmt::Result {
    write!(formatter, "{name}(")?;
    let mut first = true;
    for (key, value) in fields.iter().filter(|(key, _)| !hidden.contains(key)) {
        if !first {
            formatter.write_str(", ")?;
        }
        first = false;
        write!(formatter, "{key}: {value}")?;
    }
    formatter.write_str(")")
}

impl fmt::Display for Command {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_fields(formatter, self.name(), &self.fields, &[NAME_KEY, UUID_KEY])
    }
}
