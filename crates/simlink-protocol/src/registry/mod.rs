//! Registry of the concrete command types the client can decode.
//!
//! Core types live in a flat set keyed by name. Plugin types live in a tree
//! of namespaces addressed by a dotted target path such as
//! `"vendor.radio"`; each path segment selects one child namespace. A name
//! resolves only in the namespace its target path selects, so a plugin may
//! reuse a core name without conflict.

use std::collections::HashMap;

use crate::commands::{CORE_COMMANDS, TypedCommand};
use crate::error::ProtocolError;
use crate::model::CommandDescriptor;

const PATH_SEPARATOR: char = '.';

/// Resolves a wire name to the metadata of its concrete type.
#[cfg_attr(test, mockall::automock)]
pub trait CommandLookup {
    /// Looks up `name` in the core set, or in the plugin namespace selected
    /// by `target_id` when one is given.
    fn resolve<'a>(&self, name: &str, target_id: Option<&'a str>) -> Option<CommandDescriptor>;
}

/// Commands registered in one namespace.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    descriptors: HashMap<&'static str, CommandDescriptor>,
}

impl CommandSet {
    fn insert(&mut self, descriptor: CommandDescriptor) -> Result<(), ProtocolError> {
        if self.descriptors.contains_key(descriptor.name()) {
            return Err(ProtocolError::Registration {
                message: format!("command '{}' is already registered", descriptor.name()),
            });
        }
        self.descriptors.insert(descriptor.name(), descriptor);
        Ok(())
    }

    /// Looks up a command by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.descriptors.get(name)
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// One node of the plugin namespace tree.
#[derive(Debug, Clone, Default)]
pub struct PluginNamespace {
    commands: CommandSet,
    children: HashMap<String, PluginNamespace>,
}

impl PluginNamespace {
    /// Commands registered directly in this namespace.
    #[must_use]
    pub const fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// Child namespace for one path segment.
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&Self> {
        self.children.get(segment)
    }
}

/// Core command set plus the plugin namespace tree.
///
/// # Example
///
/// ```
/// use simlink_protocol::{CommandDescriptor, CommandLookup, CommandRegistry, ExecutePermission};
///
/// let mut registry = CommandRegistry::with_core_commands();
/// let tune = CommandDescriptor::command("Tune", ExecutePermission::EXECUTE_IF_IDLE)
///     .in_plugin("vendor.radio");
/// registry.register(tune).expect("registration succeeds");
/// assert!(registry.resolve("Tune", Some("vendor.radio")).is_some());
/// assert!(registry.resolve("Tune", None).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    core: CommandSet,
    plugins: PluginNamespace,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the core command set.
    #[must_use]
    pub fn with_core_commands() -> Self {
        let mut registry = Self::new();
        for descriptor in CORE_COMMANDS {
            registry.core.descriptors.insert(descriptor.name(), descriptor);
        }
        registry
    }

    /// Registers a descriptor in the namespace its target path names.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Registration`] for duplicate names or a
    /// malformed target path.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), ProtocolError> {
        match descriptor.target_id() {
            Some(path) => self.register_plugin(path, descriptor),
            None => self.register_core(descriptor),
        }
    }

    /// Registers a typed command.
    ///
    /// # Errors
    ///
    /// As for [`CommandRegistry::register`].
    pub fn register_type<T: TypedCommand>(&mut self) -> Result<(), ProtocolError> {
        self.register(T::DESCRIPTOR)
    }

    /// Registers a core command.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Registration`] if the name is taken or the
    /// descriptor names a plugin.
    pub fn register_core(&mut self, descriptor: CommandDescriptor) -> Result<(), ProtocolError> {
        if let Some(path) = descriptor.target_id() {
            return Err(ProtocolError::Registration {
                message: format!(
                    "command '{}' belongs to plugin '{path}', not the core set",
                    descriptor.name()
                ),
            });
        }
        self.core.insert(descriptor)
    }

    /// Registers a command under a dotted plugin path.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Registration`] if the descriptor does not
    /// declare `path` as its plugin, the path has an empty segment, or the
    /// name is already taken in that namespace. Commands built from an
    /// untargeted descriptor would carry no `CmdTargetId` and resolve in the
    /// core set instead.
    pub fn register_plugin(
        &mut self,
        path: &str,
        descriptor: CommandDescriptor,
    ) -> Result<(), ProtocolError> {
        match descriptor.target_id() {
            Some(declared) if declared == path => {}
            Some(declared) => {
                return Err(ProtocolError::Registration {
                    message: format!(
                        "command '{}' declares plugin '{declared}' but was registered under \
                         '{path}'",
                        descriptor.name()
                    ),
                });
            }
            None => {
                return Err(ProtocolError::Registration {
                    message: format!(
                        "command '{}' declares no plugin but was registered under '{path}'",
                        descriptor.name()
                    ),
                });
            }
        }
        let mut namespace = &mut self.plugins;
        for segment in path_segments(path)? {
            namespace = namespace.children.entry(segment.to_owned()).or_default();
        }
        namespace.commands.insert(descriptor)
    }

    /// The core command set.
    #[must_use]
    pub const fn core(&self) -> &CommandSet {
        &self.core
    }

    /// Root of the plugin namespace tree.
    #[must_use]
    pub const fn plugins(&self) -> &PluginNamespace {
        &self.plugins
    }

    fn plugin_namespace(&self, path: &str) -> Option<&PluginNamespace> {
        path_segments(path)
            .ok()?
            .into_iter()
            .try_fold(&self.plugins, |namespace, segment| namespace.child(segment))
    }
}

impl CommandLookup for CommandRegistry {
    fn resolve(&self, name: &str, target_id: Option<&str>) -> Option<CommandDescriptor> {
        let commands = match target_id {
            Some(path) => self.plugin_namespace(path)?.commands(),
            None => &self.core,
        };
        commands.get(name).copied()
    }
}

fn path_segments(path: &str) -> Result<Vec<&str>, ProtocolError> {
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ProtocolError::Registration {
            message: format!("plugin path '{path}' has an empty segment"),
        });
    }
    Ok(segments)
}
