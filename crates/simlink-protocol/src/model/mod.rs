//! The generic command model.
//!
//! Every command and result is an ordered [`FieldMap`] with reserved identity
//! fields. Concrete types are recovered from the `CmdName` field by the
//! [`crate::factory`]; typed wrappers live in [`crate::commands`].

mod command;
mod descriptor;
mod result;
mod value;

pub use command::{Command, NAME_KEY, TARGET_ID_KEY, TIMESTAMP_KEY, UUID_KEY};
pub use descriptor::{CommandDescriptor, CommandKind, ExecutePermission};
pub use result::{CommandFailed, CommandResult, ERROR_MSG_KEY, RELATED_COMMAND_KEY};
pub use value::{FieldMap, FieldValue};
