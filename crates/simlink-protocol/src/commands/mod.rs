//! Typed command wrappers and the core command set.
//!
//! A typed command is a thin view over a [`Command`] whose name matches the
//! type's [`CommandDescriptor`]. Wrappers built by callers get a fresh
//! identity; wrappers built from the wire keep the decoded fields untouched.

use time::PrimitiveDateTime;

use crate::model::{
    Command, CommandDescriptor, ERROR_MSG_KEY, ExecutePermission, FieldValue,
};

/// Protocol version announced during negotiation.
pub const API_VERSION: u32 = 38;

/// A concrete command or result type known to the client.
pub trait TypedCommand: Sized {
    /// Static identity and properties of the type.
    const DESCRIPTOR: CommandDescriptor;

    /// Wraps a command already carrying this type's name.
    ///
    /// No identity is generated; the fields are kept as decoded.
    fn from_command(command: Command) -> Self;

    /// Borrows the underlying command.
    fn command(&self) -> &Command;

    /// Returns the underlying command.
    fn into_command(self) -> Command;
}

macro_rules! typed_command {
    ($(#[$meta:meta])* $name:ident => $descriptor:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            command: Command,
        }

        impl TypedCommand for $name {
            const DESCRIPTOR: CommandDescriptor = $descriptor;

            fn from_command(command: Command) -> Self {
                Self { command }
            }

            fn command(&self) -> &Command {
                &self.command
            }

            fn into_command(self) -> Command {
                self.command
            }
        }

        impl From<$name> for Command {
            fn from(value: $name) -> Self {
                value.command
            }
        }
    };
}

typed_command!(
    /// Generic successful outcome.
    SuccessResult => CommandDescriptor::result("SuccessResult", true)
);

typed_command!(
    /// Generic failed outcome carrying an error message.
    FailureResult => CommandDescriptor::result("FailureResult", false)
);

typed_command!(
    /// Asks for the simulator state.
    GetSimulatorState => CommandDescriptor::command(
        "GetSimulatorState",
        ExecutePermission::EXECUTE_IF_IDLE
            .union(ExecutePermission::EXECUTE_IF_SIMULATING)
            .union(ExecutePermission::EXECUTE_IF_NO_CONFIG),
    )
);

typed_command!(
    /// Answer to [`GetSimulatorState`].
    SimulatorStateResult => CommandDescriptor::result("SimulatorStateResult", true)
);

typed_command!(
    /// Starts the simulation.
    Start => CommandDescriptor::command("Start", ExecutePermission::EXECUTE_IF_IDLE)
);

typed_command!(
    /// Stops the simulation.
    Stop => CommandDescriptor::command(
        "Stop",
        ExecutePermission::EXECUTE_IF_IDLE.union(ExecutePermission::EXECUTE_IF_SIMULATING),
    )
);

typed_command!(
    /// Sets the GPS start time of the next simulation.
    SetGpsStartTime => CommandDescriptor::command(
        "SetGpsStartTime",
        ExecutePermission::EXECUTE_IF_IDLE,
    )
);

/// Descriptors of every core type, in registration order.
pub const CORE_COMMANDS: [CommandDescriptor; 7] = [
    SuccessResult::DESCRIPTOR,
    FailureResult::DESCRIPTOR,
    GetSimulatorState::DESCRIPTOR,
    SimulatorStateResult::DESCRIPTOR,
    Start::DESCRIPTOR,
    Stop::DESCRIPTOR,
    SetGpsStartTime::DESCRIPTOR,
];

const STATE_KEY: &str = "State";
const STATE_ID_KEY: &str = "StateId";
const START_KEY: &str = "Start";

fn fresh<T: TypedCommand>() -> Command {
    Command::from_descriptor(T::DESCRIPTOR)
}

impl FailureResult {
    /// Builds a failure answering nothing in particular.
    #[must_use]
    pub fn new(error_msg: &str) -> Self {
        let mut command = fresh::<Self>();
        command.set(ERROR_MSG_KEY, error_msg);
        Self { command }
    }

    /// The failure text.
    #[must_use]
    pub fn error_msg(&self) -> Option<&str> {
        self.command.get_str(ERROR_MSG_KEY)
    }
}

impl SuccessResult {
    /// Builds a success result.
    #[must_use]
    pub fn new() -> Self {
        Self {
            command: fresh::<Self>(),
        }
    }
}

impl Default for SuccessResult {
    fn default() -> Self {
        Self::new()
    }
}

impl GetSimulatorState {
    /// Builds the request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            command: fresh::<Self>(),
        }
    }
}

impl Default for GetSimulatorState {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorStateResult {
    /// Builds a state answer.
    #[must_use]
    pub fn new(state: &str) -> Self {
        let mut command = fresh::<Self>();
        command.set(STATE_KEY, state);
        Self { command }
    }

    /// Human-readable simulator state, such as `"Started"`.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.command.get_str(STATE_KEY)
    }

    /// Numeric state identifier, when the server sends one.
    #[must_use]
    pub fn state_id(&self) -> Option<i64> {
        self.command.get(STATE_ID_KEY).and_then(FieldValue::as_i64)
    }
}

impl Start {
    /// Builds the request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            command: fresh::<Self>(),
        }
    }
}

impl Default for Start {
    fn default() -> Self {
        Self::new()
    }
}

impl Stop {
    /// Builds the request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            command: fresh::<Self>(),
        }
    }
}

impl Default for Stop {
    fn default() -> Self {
        Self::new()
    }
}

impl SetGpsStartTime {
    /// Builds the request for a UTC start time.
    #[must_use]
    pub fn new(start: PrimitiveDateTime) -> Self {
        let mut command = fresh::<Self>();
        command.set(START_KEY, start);
        Self { command }
    }

    /// Requested start time.
    #[must_use]
    pub fn start(&self) -> Option<PrimitiveDateTime> {
        self.command.get(START_KEY).and_then(FieldValue::as_date_time)
    }
}
