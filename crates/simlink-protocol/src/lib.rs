//! Client protocol layer for driving a remote simulation server.
//!
//! The server speaks a framed, self-describing protocol over one persistent
//! stream. Each frame carries a message kind and a payload; commands and
//! results travel as JSON field maps identified by name and UUID. Results
//! arrive asynchronously and may be interleaved with unrelated traffic, so
//! the [`Session`] correlates them back to their command by UUID.
//!
//! # Layers
//!
//! - [`channel`]: length-prefixed frames over any `Read + Write` stream.
//! - [`model`]: the generic command and result model.
//! - [`commands`]: typed wrappers and the core command set.
//! - [`registry`] and [`factory`]: rebuild concrete commands from payloads,
//!   including commands addressed to plugin namespaces.
//! - [`session`]: version negotiation and blocking request/response.
//!
//! # Example
//!
//! ```rust,no_run
//! use simlink_config::Config;
//! use simlink_protocol::commands::{GetSimulatorState, TypedCommand};
//! use simlink_protocol::{CommandRegistry, Session};
//!
//! let config = Config::default();
//! let mut session = Session::connect(&config, CommandRegistry::with_core_commands())?;
//! let server_version = session.negotiate_version()?;
//! let result = session.call(GetSimulatorState::new().command())?;
//! println!("server v{server_version}: {}", result.message());
//! # Ok::<(), simlink_protocol::ProtocolError>(())
//! ```

pub mod channel;
pub mod commands;
pub mod connection;
pub mod error;
pub mod factory;
pub mod model;
pub mod registry;
pub mod session;

#[cfg(test)]
mod tests;

pub use self::channel::{Frame, FramedChannel, MessageKind};
pub use self::commands::{API_VERSION, TypedCommand};
pub use self::connection::{Connection, connect};
pub use self::error::ProtocolError;
pub use self::factory::CommandFactory;
pub use self::model::{
    Command, CommandDescriptor, CommandFailed, CommandKind, CommandResult, ExecutePermission,
    FieldMap, FieldValue,
};
pub use self::registry::{CommandLookup, CommandRegistry};
pub use self::session::Session;
