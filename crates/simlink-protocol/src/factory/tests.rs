//! Unit tests for the command factory.

use rstest::{fixture, rstest};

use super::*;
use crate::commands::{FailureResult, SimulatorStateResult, Start, SuccessResult, TypedCommand};
use crate::model::{CommandDescriptor, ERROR_MSG_KEY, ExecutePermission, UUID_KEY};
use crate::registry::{CommandRegistry, MockCommandLookup};

const TUNE: CommandDescriptor =
    CommandDescriptor::command("Tune", ExecutePermission::EXECUTE_IF_IDLE)
        .in_plugin("vendor.radio");

#[fixture]
fn factory() -> CommandFactory<CommandRegistry> {
    let mut registry = CommandRegistry::with_core_commands();
    registry.register(TUNE).expect("register plugin command");
    CommandFactory::new(registry)
}

fn result_text(name: &str, related: &Command, extra: &[(&str, FieldValue)]) -> String {
    let mut result = Command::new(name);
    result.set(RELATED_COMMAND_KEY, related.to_json().expect("encode related"));
    for (key, value) in extra {
        result.set(*key, value.clone());
    }
    result.to_json().expect("encode result")
}

#[rstest]
fn create_command_keeps_wire_identity(factory: CommandFactory<CommandRegistry>) {
    let text = r#"{"CmdName":"Start","CmdUuid":"{abc}"}"#;
    let command = factory.create_command(text).expect("decode");
    assert_eq!(command.name(), "Start");
    assert_eq!(command.uuid(), "{abc}");
    assert_eq!(command.descriptor(), Some(&Start::DESCRIPTOR));
}

#[rstest]
fn plugin_commands_resolve_through_target_path(factory: CommandFactory<CommandRegistry>) {
    let text = r#"{"CmdName":"Tune","CmdUuid":"{1}","CmdTargetId":"vendor.radio","Hz":101.5}"#;
    let command = factory.create_command(text).expect("decode");
    assert_eq!(command.target_id(), Some("vendor.radio"));
    assert_eq!(command.descriptor(), Some(&TUNE));
    assert_eq!(command.get("Hz").and_then(FieldValue::as_f64), Some(101.5));
}

#[rstest]
#[case(r#"{"CmdName":"Tune","CmdUuid":"{1}"}"#, "unknown command 'Tune'")]
#[case(
    r#"{"CmdName":"Tune","CmdUuid":"{1}","CmdTargetId":"vendor"}"#,
    "unknown command 'Tune' in plugin 'vendor'"
)]
#[case(r#"{"CmdName":"Nope","CmdUuid":"{1}"}"#, "unknown command 'Nope'")]
fn unknown_names_are_resolution_errors(
    factory: CommandFactory<CommandRegistry>,
    #[case] text: &str,
    #[case] message: &str,
) {
    let error = factory.create_command(text).expect_err("must not resolve");
    assert!(matches!(error, ProtocolError::Resolution { .. }));
    assert_eq!(error.to_string(), message);
}

#[rstest]
#[case("not json")]
#[case("[1, 2]")]
#[case(r#"{"CmdUuid":"{1}"}"#)]
#[case(r#"{"CmdName":7}"#)]
fn malformed_payloads_are_parse_errors(
    factory: CommandFactory<CommandRegistry>,
    #[case] text: &str,
) {
    let error = factory.create_command(text).expect_err("must fail");
    assert!(matches!(error, ProtocolError::Parse { .. }), "{error:?}");
}

#[rstest]
fn create_result_decodes_related_command_from_string(factory: CommandFactory<CommandRegistry>) {
    let start = Start::new().into_command();
    let text = result_text("SuccessResult", &start, &[]);
    let result = factory.create_result(&text).expect("decode result");
    assert!(result.is_success());
    assert_eq!(result.related_command().uuid(), start.uuid());
    assert_eq!(result.related_command().descriptor(), Some(&Start::DESCRIPTOR));
    assert_eq!(result.message(), "Success");
    assert!(result.downcast::<SuccessResult>().is_some());
}

#[rstest]
fn create_result_accepts_inline_related_object(factory: CommandFactory<CommandRegistry>) {
    let text = concat!(
        r#"{"CmdName":"SimulatorStateResult","CmdUuid":"{r}","#,
        r#""RelatedCommand":{"CmdName":"GetSimulatorState","CmdUuid":"{q}"},"#,
        r#""State":"Started"}"#
    );
    let result = factory.create_result(text).expect("decode result");
    assert_eq!(result.related_command().uuid(), "{q}");
    let state = result
        .downcast::<SimulatorStateResult>()
        .expect("typed view");
    assert_eq!(state.state(), Some("Started"));
    assert_eq!(result.to_string(), "SimulatorStateResult(State: Started)");
}

#[rstest]
fn failure_results_carry_their_message(factory: CommandFactory<CommandRegistry>) {
    let start = Start::new().into_command();
    let text = result_text(
        "FailureResult",
        &start,
        &[(ERROR_MSG_KEY, FieldValue::from("simulator busy"))],
    );
    let result = factory.create_result(&text).expect("decode result");
    assert!(!result.is_success());
    assert_eq!(result.error_msg(), Some("simulator busy"));
    assert_eq!(result.message(), "simulator busy");
    assert!(result.downcast::<FailureResult>().is_some());

    let failed = result.ensure_success().expect_err("failure surfaces");
    assert_eq!(failed.to_string(), "Start failed: simulator busy");
    assert_eq!(failed.result().related_command().uuid(), start.uuid());
}

#[rstest]
fn create_result_rejects_non_result_types(factory: CommandFactory<CommandRegistry>) {
    let start = Start::new().into_command();
    let text = result_text("Start", &start, &[]);
    let error = factory.create_result(&text).expect_err("not a result");
    assert!(error.to_string().contains("not a result type"));
}

#[rstest]
fn create_result_requires_related_command(factory: CommandFactory<CommandRegistry>) {
    let text = r#"{"CmdName":"SuccessResult","CmdUuid":"{r}"}"#;
    let error = factory.create_result(text).expect_err("missing related");
    assert!(matches!(error, ProtocolError::Parse { .. }));
}

#[rstest]
fn unresolvable_related_command_fails_the_result(factory: CommandFactory<CommandRegistry>) {
    let unknown = Command::new("Mystery");
    let text = result_text("SuccessResult", &unknown, &[]);
    let error = factory.create_result(&text).expect_err("related unknown");
    assert!(matches!(error, ProtocolError::Resolution { ref name, .. } if name == "Mystery"));
}

#[rstest]
fn factory_consults_lookup_with_target_path() {
    let mut lookup = MockCommandLookup::new();
    lookup
        .expect_resolve()
        .withf(|name, target_id| name == "Tune" && *target_id == Some("vendor.radio"))
        .times(1)
        .return_const(Some(TUNE));
    let factory = CommandFactory::new(lookup);
    let text = r#"{"CmdName":"Tune","CmdUuid":"{1}","CmdTargetId":"vendor.radio"}"#;
    let command = factory.create_command(text).expect("decode");
    assert_eq!(command.fields().get(UUID_KEY), Some(&FieldValue::from("{1}")));
}

#[rstest]
fn factory_resolves_core_names_without_target() {
    let mut lookup = MockCommandLookup::new();
    lookup
        .expect_resolve()
        .withf(|name, target_id| name == "Start" && target_id.is_none())
        .times(1)
        .return_const(None);
    let factory = CommandFactory::new(lookup);
    let error = factory
        .create_command(r#"{"CmdName":"Start","CmdUuid":"{1}"}"#)
        .expect_err("lookup declines");
    assert!(matches!(error, ProtocolError::Resolution { target_id: None, .. }));
}
