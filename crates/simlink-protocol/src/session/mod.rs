//! Request/response orchestration over one framed connection.
//!
//! A [`Session`] owns the channel and the command factory. Responses can
//! arrive interleaved with unrelated traffic (results for other commands,
//! version replies, server notifications), so every wait loop reads frames
//! until the one it wants shows up and silently drops everything else.
//! Correlation is by the related command's UUID only; no ordering between
//! requests and responses is assumed.
//!
//! The session is single-threaded and blocking. A read deadline configured
//! on the connection is the only way out of a wait loop other than the
//! matching frame or a channel error.

use std::io::{Read, Write};
use std::time::Duration;

use simlink_config::Config;
use tracing::{debug, trace};

use crate::channel::payload::{
    decode_result_payload, decode_version, encode_command_payload, encode_version,
};
use crate::channel::{Frame, FramedChannel, MessageKind};
use crate::commands::API_VERSION;
use crate::connection::{self, Connection};
use crate::error::ProtocolError;
use crate::factory::CommandFactory;
use crate::model::{Command, CommandResult};
use crate::registry::{CommandLookup, CommandRegistry};

/// A client session with the simulation server.
#[derive(Debug)]
pub struct Session<S = Connection, L = CommandRegistry> {
    channel: FramedChannel<S>,
    factory: CommandFactory<L>,
    client_version: u32,
    closed: bool,
}

impl Session<Connection, CommandRegistry> {
    /// Connects to the configured server.
    ///
    /// The configured read timeout is applied to the connection and the
    /// configured API version, if any, replaces [`API_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Resolve`] or [`ProtocolError::Connect`] when
    /// the server cannot be reached.
    pub fn connect(config: &Config, registry: CommandRegistry) -> Result<Self, ProtocolError> {
        let connection = connection::connect(config.server(), config.connect_timeout())?;
        connection.set_read_timeout(config.read_timeout())?;
        let session = Self::new(connection, registry);
        Ok(match config.api_version() {
            Some(version) => session.with_client_version(version),
            None => session,
        })
    }
}

impl<L> Session<Connection, L> {
    /// Changes the read deadline for subsequent receives.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] when the socket rejects the timeout.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), ProtocolError> {
        self.channel.get_ref().set_read_timeout(timeout)
    }

    /// Shuts the connection down.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] when the shutdown fails on a session
    /// that was still open.
    pub fn close(self) -> Result<(), ProtocolError> {
        if self.closed {
            return Ok(());
        }
        debug!(target: "simlink::session", "closing session");
        self.channel.into_inner().shutdown()
    }
}

impl<S, L> Session<S, L> {
    /// Wraps an already connected stream.
    #[must_use]
    pub const fn new(stream: S, lookup: L) -> Self {
        Self {
            channel: FramedChannel::new(stream),
            factory: CommandFactory::new(lookup),
            client_version: API_VERSION,
            closed: false,
        }
    }

    /// Overrides the version announced by [`Session::negotiate_version`].
    #[must_use]
    pub fn with_client_version(mut self, version: u32) -> Self {
        self.client_version = version;
        self
    }

    /// Version announced to the server.
    #[must_use]
    pub const fn client_version(&self) -> u32 {
        self.client_version
    }

    /// Returns `true` once the session has seen a fatal error.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// The factory used to decode incoming results.
    #[must_use]
    pub const fn factory(&self) -> &CommandFactory<L> {
        &self.factory
    }

    /// Borrows the underlying stream.
    #[must_use]
    pub const fn get_ref(&self) -> &S {
        self.channel.get_ref()
    }

    /// Returns the underlying stream.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.channel.into_inner()
    }

    fn ensure_open(&self) -> Result<(), ProtocolError> {
        if self.closed {
            Err(ProtocolError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn track<T>(&mut self, outcome: Result<T, ProtocolError>) -> Result<T, ProtocolError> {
        if let Err(error) = &outcome
            && error.is_fatal()
        {
            debug!(target: "simlink::session", %error, "session closed by fatal error");
            self.closed = true;
        }
        outcome
    }
}

impl<S: Read + Write, L: CommandLookup> Session<S, L> {
    /// Announces the client version and returns the server's.
    ///
    /// Frames of any other kind received meanwhile are discarded. No
    /// compatibility check is made; the caller decides how to react to a
    /// mismatch.
    ///
    /// # Errors
    ///
    /// Returns channel errors, or [`ProtocolError::Parse`] for a truncated
    /// version payload.
    pub fn negotiate_version(&mut self) -> Result<u32, ProtocolError> {
        self.ensure_open()?;
        let announced = encode_version(self.client_version);
        let sent = self.channel.send(MessageKind::ApiVersion, &announced);
        self.track(sent)?;
        debug!(target: "simlink::session", version = self.client_version, "api version sent");
        loop {
            let frame = self.receive()?;
            if frame.kind == MessageKind::ApiVersion {
                let version = decode_version(&frame.payload)?;
                debug!(target: "simlink::session", version, "server api version received");
                return Ok(version);
            }
            discard(&frame, "waiting for api version");
        }
    }

    /// Sends a command without waiting for its result.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooLarge`] for oversize commands, or a
    /// channel error.
    pub fn send(&mut self, command: &Command) -> Result<(), ProtocolError> {
        self.ensure_open()?;
        let payload = encode_command_payload(&command.to_json()?);
        let sent = self.channel.send(MessageKind::Command, &payload);
        self.track(sent)?;
        debug!(
            target: "simlink::session",
            name = command.name(),
            uuid = command.uuid(),
            "command sent"
        );
        Ok(())
    }

    /// Blocks until the result answering `command` arrives.
    ///
    /// Results for other commands and frames of other kinds are discarded.
    ///
    /// # Errors
    ///
    /// Returns channel errors, and decode errors for any result frame that
    /// cannot be reconstructed. The offending frame is consumed either way.
    pub fn wait_result(&mut self, command: &Command) -> Result<CommandResult, ProtocolError> {
        self.ensure_open()?;
        loop {
            let frame = self.receive()?;
            if frame.kind != MessageKind::Result {
                discard(&frame, "waiting for result");
                continue;
            }
            let text = decode_result_payload(&frame.payload)?;
            let result = self.factory.create_result(text)?;
            if result.related_command().uuid() == command.uuid() {
                debug!(
                    target: "simlink::session",
                    name = result.name(),
                    related = command.name(),
                    success = result.is_success(),
                    "result received"
                );
                return Ok(result);
            }
            trace!(
                target: "simlink::session",
                name = result.name(),
                related_uuid = result.related_command().uuid(),
                "discarding result for another command"
            );
        }
    }

    /// Sends a command and waits for its result.
    ///
    /// # Errors
    ///
    /// As for [`Session::send`] and [`Session::wait_result`].
    pub fn call(&mut self, command: &Command) -> Result<CommandResult, ProtocolError> {
        self.send(command)?;
        self.wait_result(command)
    }

    fn receive(&mut self) -> Result<Frame, ProtocolError> {
        let received = self.channel.receive();
        let frame = self.track(received)?;
        trace!(
            target: "simlink::session",
            kind = %frame.kind,
            len = frame.payload.len(),
            "frame received"
        );
        Ok(frame)
    }
}

fn discard(frame: &Frame, reason: &str) {
    trace!(
        target: "simlink::session",
        kind = %frame.kind,
        len = frame.payload.len(),
        reason,
        "discarding frame"
    );
}
