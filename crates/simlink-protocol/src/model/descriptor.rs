//! Static metadata attached to each concrete command type.

use bitflags::bitflags;

bitflags! {
    /// Simulator states in which a command may run.
    ///
    /// The server consults these flags; the client only carries them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExecutePermission: u8 {
        /// The simulator is idle.
        const EXECUTE_IF_IDLE = 1 << 1;
        /// The simulator is running.
        const EXECUTE_IF_SIMULATING = 1 << 2;
        /// No configuration is loaded.
        const EXECUTE_IF_NO_CONFIG = 1 << 3;
    }
}

impl Default for ExecutePermission {
    fn default() -> Self {
        Self::EXECUTE_IF_IDLE
    }
}

/// Role of a concrete type in the command model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// A request sent to the server.
    Command,
    /// A successful result.
    Success,
    /// A failed result carrying an error message.
    Failure,
}

impl CommandKind {
    /// Returns `true` for either result variant.
    #[must_use]
    pub const fn is_result(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// Identity and static properties of a concrete command or result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandDescriptor {
    name: &'static str,
    target_id: Option<&'static str>,
    kind: CommandKind,
    permission: ExecutePermission,
    deprecated: Option<&'static str>,
}

impl CommandDescriptor {
    /// Describes a core command.
    #[must_use]
    pub const fn command(name: &'static str, permission: ExecutePermission) -> Self {
        Self {
            name,
            target_id: None,
            kind: CommandKind::Command,
            permission,
            deprecated: None,
        }
    }

    /// Describes a core result.
    #[must_use]
    pub const fn result(name: &'static str, success: bool) -> Self {
        Self {
            name,
            target_id: None,
            kind: if success {
                CommandKind::Success
            } else {
                CommandKind::Failure
            },
            permission: ExecutePermission::EXECUTE_IF_IDLE,
            deprecated: None,
        }
    }

    /// Places the type in a plugin namespace (`"vendor.plugin"`).
    #[must_use]
    pub const fn in_plugin(mut self, target_id: &'static str) -> Self {
        self.target_id = Some(target_id);
        self
    }

    /// Marks the type as deprecated with a migration note.
    #[must_use]
    pub const fn deprecated_by(mut self, note: &'static str) -> Self {
        self.deprecated = Some(note);
        self
    }

    /// Wire name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Plugin namespace path, `None` for core types.
    #[must_use]
    pub const fn target_id(&self) -> Option<&'static str> {
        self.target_id
    }

    /// Command or result role.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    /// States in which the command may run.
    #[must_use]
    pub const fn permission(&self) -> ExecutePermission {
        self.permission
    }

    /// Deprecation note, if any.
    #[must_use]
    pub const fn deprecated(&self) -> Option<&'static str> {
        self.deprecated
    }
}
