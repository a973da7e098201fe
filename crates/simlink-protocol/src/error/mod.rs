//! Errors raised by the protocol layer.
//!
//! Transport failures (`ConnectionClosed`, `Timeout`, `Desynchronised`,
//! `Io`) abort the operation in progress. Only a `Timeout` at a frame
//! boundary leaves the stream usable. Decode failures (`Parse`,
//! `Resolution`) abort only the message being processed; the frame has
//! already been consumed so the stream stays aligned. I/O errors are wrapped
//! in `Arc` to satisfy the `result_large_err` Clippy lint.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer closed the stream before a full frame was read.
    #[error("server closed connection")]
    ConnectionClosed,

    /// The configured read deadline elapsed while waiting for bytes.
    #[error("timed out waiting for the server")]
    Timeout {
        /// Underlying I/O error reported by the stream.
        #[source]
        source: Arc<io::Error>,
    },

    /// The read deadline elapsed part-way through a frame, so the position of
    /// the next frame boundary is unknown.
    #[error("timed out after reading {consumed} bytes of a frame")]
    Desynchronised {
        /// Bytes of the interrupted frame already consumed.
        consumed: usize,
        /// Underlying I/O error reported by the stream.
        #[source]
        source: Arc<io::Error>,
    },

    /// Any other I/O failure on the stream.
    #[error("I/O error on the server connection: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The endpoint address could not be resolved.
    #[error("failed to resolve server address {endpoint}: {source}")]
    Resolve {
        /// Endpoint that was being resolved.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The connection attempt failed.
    #[error("failed to connect to server at {endpoint}: {source}")]
    Connect {
        /// Endpoint that was being connected to.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The platform has no Unix domain socket support.
    #[error("platform does not support Unix sockets: {endpoint}")]
    UnsupportedTransport {
        /// Endpoint that requested the Unix transport.
        endpoint: String,
    },

    /// A payload is too large for the 16-bit frame length.
    #[error("payload of {size} bytes does not fit in a frame")]
    FrameTooLarge {
        /// Payload size in bytes.
        size: usize,
    },

    /// A frame declared a length too short to hold its kind byte.
    #[error("received a frame without a message kind")]
    MalformedFrame,

    /// A payload is not a well-formed encoded field mapping.
    #[error("failed to parse message: {message}")]
    Parse {
        /// Human-readable description of the parse failure.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<Arc<serde_json::Error>>,
    },

    /// The command name does not exist in the resolved namespace.
    #[error("{}", describe_resolution(.name, .target_id))]
    Resolution {
        /// Command name carried on the wire.
        name: String,
        /// Dotted plugin path, when the command targets a plugin.
        target_id: Option<String>,
    },

    /// A command descriptor could not be registered.
    #[error("registration error: {message}")]
    Registration {
        /// Description of the conflict.
        message: String,
    },

    /// The session already observed a fatal error or was closed.
    #[error("session is closed")]
    SessionClosed,
}

impl ProtocolError {
    /// Builds a [`ProtocolError::Parse`] without an underlying JSON error.
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a [`ProtocolError::Parse`] wrapping a JSON error.
    pub(crate) fn json(context: &str, source: serde_json::Error) -> Self {
        Self::Parse {
            message: format!("{context}: {source}"),
            source: Some(Arc::new(source)),
        }
    }

    /// Classifies a stream error into timeout or generic I/O.
    pub(crate) fn from_io(source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Timeout {
                source: Arc::new(source),
            },
            _ => Self::Io {
                source: Arc::new(source),
            },
        }
    }

    /// Returns `true` when the session cannot continue after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed
                | Self::Desynchronised { .. }
                | Self::Io { .. }
                | Self::SessionClosed
        )
    }
}

fn describe_resolution(name: &str, target_id: &Option<String>) -> String {
    match target_id {
        Some(target) => format!("unknown command '{name}' in plugin '{target}'"),
        None => format!("unknown command '{name}'"),
    }
}
