//! Behaviour-driven tests for session correlation.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::channel::MessageKind;
use crate::commands::{Start, Stop, TypedCommand};
use crate::error::ProtocolError;
use crate::model::{
    Command, CommandDescriptor, CommandResult, ERROR_MSG_KEY, ExecutePermission, FieldValue,
};
use crate::registry::CommandRegistry;
use crate::session::Session;

use super::support::{ScriptedStream, result_payload_for, version_payload};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

struct TestWorld {
    registry: CommandRegistry,
    stream: ScriptedStream,
    pending: Command,
    session: Option<Session<ScriptedStream, CommandRegistry>>,
    outcome: Option<Result<CommandResult, ProtocolError>>,
    version: Option<Result<u32, ProtocolError>>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self {
            registry: CommandRegistry::with_core_commands(),
            stream: ScriptedStream::new(),
            pending: Start::new().into_command(),
            session: None,
            outcome: None,
            version: None,
        }
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn session(world: &mut TestWorld) -> &mut Session<ScriptedStream, CommandRegistry> {
    let stream = std::mem::take(&mut world.stream);
    let registry = world.registry.clone();
    world
        .session
        .get_or_insert_with(|| Session::new(stream, registry))
}

fn successful_result(world: &TestWorld) -> &CommandResult {
    world
        .outcome
        .as_ref()
        .expect("no outcome captured")
        .as_ref()
        .expect("expected a result but got an error")
}

fn leak(text: &str) -> &'static str {
    Box::leak(text.trim_matches('"').to_owned().into_boxed_str())
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("the server first answers {count} other commands")]
fn given_unrelated_results(world: &mut TestWorld, count: usize) {
    for _ in 0..count {
        let other = Stop::new().into_command();
        world.stream.push_frame(
            MessageKind::Result,
            &result_payload_for("SuccessResult", &other, &[]),
        );
    }
}

#[given("the server then answers the pending command with success")]
fn given_success(world: &mut TestWorld) {
    let payload = result_payload_for("SuccessResult", &world.pending, &[]);
    world.stream.push_frame(MessageKind::Result, &payload);
}

#[given("the server answers the pending command with success")]
fn given_plain_success(world: &mut TestWorld) {
    given_success(world);
}

#[given("the server answers the pending command with failure {message}")]
fn given_failure(world: &mut TestWorld, message: String) {
    let payload = result_payload_for(
        "FailureResult",
        &world.pending,
        &[(ERROR_MSG_KEY, FieldValue::from(message.trim_matches('"')))],
    );
    world.stream.push_frame(MessageKind::Result, &payload);
}

#[given("the server then announces api version {version}")]
fn given_version(world: &mut TestWorld, version: u32) {
    world
        .stream
        .push_frame(MessageKind::ApiVersion, &version_payload(version));
}

#[given("the server closes the connection")]
fn given_closed(world: &mut TestWorld) {
    world.stream = ScriptedStream::new();
}

#[given("a plugin command {name} registered under {path}")]
fn given_plugin_command(world: &mut TestWorld, name: String, path: String) {
    let descriptor = CommandDescriptor::command(leak(&name), ExecutePermission::EXECUTE_IF_IDLE)
        .in_plugin(leak(&path));
    world
        .registry
        .register(descriptor)
        .expect("register plugin command");
}

#[given("the pending command is the plugin command {name} for {path}")]
fn given_pending_plugin(world: &mut TestWorld, name: String, path: String) {
    world.pending = Command::with_target(name.trim_matches('"'), path.trim_matches('"'));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the client calls the pending command")]
fn when_call(world: &mut TestWorld) {
    let pending = world.pending.clone();
    let outcome = session(world).call(&pending);
    world.outcome = Some(outcome);
}

#[when("the client negotiates the api version")]
fn when_negotiate(world: &mut TestWorld) {
    let version = session(world).negotiate_version();
    world.version = Some(version);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the call succeeds with message {message}")]
fn then_success(world: &mut TestWorld, message: String) {
    let result = successful_result(world);
    assert!(result.is_success(), "expected success, got {result}");
    assert_eq!(result.message(), message.trim_matches('"'));
}

#[then("every scripted frame was consumed")]
fn then_consumed(world: &mut TestWorld) {
    let session = world.session.as_ref().expect("session exists");
    assert_eq!(session.get_ref().remaining_steps(), 0);
}

#[then("the negotiated version is {version}")]
fn then_version(world: &mut TestWorld, version: u32) {
    let negotiated = world
        .version
        .as_ref()
        .expect("no negotiation captured")
        .as_ref()
        .expect("negotiation failed");
    assert_eq!(*negotiated, version);
}

#[then("the result is a failure with message {message}")]
fn then_failure(world: &mut TestWorld, message: String) {
    let result = successful_result(world);
    assert!(!result.is_success(), "expected failure, got {result}");
    assert_eq!(result.message(), message.trim_matches('"'));
}

#[then("the call fails because the connection closed")]
fn then_connection_closed(world: &mut TestWorld) {
    let error = world
        .outcome
        .as_ref()
        .expect("no outcome captured")
        .as_ref()
        .expect_err("expected an error");
    assert!(
        matches!(error, ProtocolError::ConnectionClosed),
        "expected ConnectionClosed, got: {error}"
    );
}

#[then("calling again fails because the session is closed")]
fn then_session_closed(world: &mut TestWorld) {
    let pending = world.pending.clone();
    let error = session(world).call(&pending).expect_err("session is closed");
    assert!(
        matches!(error, ProtocolError::SessionClosed),
        "expected SessionClosed, got: {error}"
    );
}

#[then("the related command resolves to plugin {path}")]
fn then_plugin_related(world: &mut TestWorld, path: String) {
    let result = successful_result(world);
    let related = result.related_command();
    assert_eq!(related.target_id(), Some(path.trim_matches('"')));
    assert!(related.descriptor().is_some(), "related command unresolved");
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/session_correlation.feature")]
fn session_correlation_behaviour(world: TestWorld) {
    let _ = world;
}
