//! Crate-level integration and BDD tests.

use crate::channel::MessageKind;
use crate::commands::{GetSimulatorState, SimulatorStateResult, TypedCommand};
use crate::model::FieldValue;
use crate::registry::CommandRegistry;
use crate::session::Session;

pub(crate) mod support;

mod behaviour;

use support::{ScriptedStream, result_payload_for, version_payload};

#[test]
fn end_to_end_state_query_over_scripted_stream() {
    let query = GetSimulatorState::new().into_command();
    let mut stream = ScriptedStream::new().with_max_read(3);
    stream
        .push_frame(MessageKind::ApiVersion, &version_payload(38))
        .push_frame(
            MessageKind::Result,
            &result_payload_for(
                "SimulatorStateResult",
                &query,
                &[("State", FieldValue::from("Idle")), ("StateId", FieldValue::from(1_i64))],
            ),
        );

    let mut session = Session::new(stream, CommandRegistry::with_core_commands());
    assert_eq!(session.negotiate_version().expect("version"), 38);
    let result = session.call(&query).expect("state result");
    let state = result
        .downcast::<SimulatorStateResult>()
        .expect("typed state result");
    assert_eq!(state.state(), Some("Idle"));
    assert_eq!(state.state_id(), Some(1));
    assert_eq!(result.related_command().name(), "GetSimulatorState");
}
