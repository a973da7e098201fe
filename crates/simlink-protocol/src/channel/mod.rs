//! Length-prefixed framing over a byte stream.
//!
//! Every frame is `u16 LE length | u8 kind | payload`, where `length` counts
//! the kind byte plus the payload. Reads are exact-size: partial reads keep
//! accumulating and only a zero-byte read before the frame is complete is
//! reported as [`ProtocolError::ConnectionClosed`]. The channel never filters
//! by kind; every frame it reads is consumed in full.

use std::fmt;
use std::io::{self, Read, Write};

use tracing::trace;

use crate::error::ProtocolError;

pub mod payload;

const LENGTH_PREFIX_LEN: usize = 2;
const KIND_LEN: usize = 1;

/// Largest payload that fits in one frame.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - KIND_LEN;

/// Discriminator carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// An encoded command.
    Command,
    /// An encoded command result.
    Result,
    /// A protocol version announcement.
    ApiVersion,
    /// Any kind this client does not understand.
    Other(u8),
}

impl From<u8> for MessageKind {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Command,
            1 => Self::Result,
            2 => Self::ApiVersion,
            other => Self::Other(other),
        }
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Command => 0,
            MessageKind::Result => 1,
            MessageKind::ApiVersion => 2,
            MessageKind::Other(other) => other,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => formatter.write_str("command"),
            Self::Result => formatter.write_str("result"),
            Self::ApiVersion => formatter.write_str("api-version"),
            Self::Other(other) => write!(formatter, "unknown({other})"),
        }
    }
}

/// One unframed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message kind.
    pub kind: MessageKind,
    /// Payload bytes following the kind byte.
    pub payload: Vec<u8>,
}

/// Framing layer over a blocking byte stream.
#[derive(Debug)]
pub struct FramedChannel<S> {
    stream: S,
}

impl<S> FramedChannel<S> {
    /// Wraps a connected stream.
    #[must_use]
    pub const fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Borrows the underlying stream.
    #[must_use]
    pub const fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Mutably borrows the underlying stream.
    pub const fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Returns the underlying stream.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Write> FramedChannel<S> {
    /// Writes one frame.
    ///
    /// The frame is assembled in memory and written with a single
    /// `write_all`, then flushed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooLarge`] before writing anything when
    /// the payload exceeds [`MAX_PAYLOAD_LEN`], or an I/O error from the
    /// stream.
    pub fn send(&mut self, kind: MessageKind, payload: &[u8]) -> Result<(), ProtocolError> {
        let frame = encode_frame(kind, payload)?;
        self.stream
            .write_all(&frame)
            .map_err(ProtocolError::from_io)?;
        self.stream.flush().map_err(ProtocolError::from_io)?;
        trace!(target: "simlink::channel", %kind, len = payload.len(), "frame sent");
        Ok(())
    }
}

impl<S: Read> FramedChannel<S> {
    /// Blocks until one complete frame has been read.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ConnectionClosed`] when the peer closes
    /// mid-frame, [`ProtocolError::Timeout`] when a read deadline elapses
    /// before the first byte of a frame, [`ProtocolError::Desynchronised`]
    /// when it elapses part-way through one, and
    /// [`ProtocolError::MalformedFrame`] for a zero declared length.
    pub fn receive(&mut self) -> Result<Frame, ProtocolError> {
        let mut prefix = [0_u8; LENGTH_PREFIX_LEN];
        read_full(&mut self.stream, &mut prefix, 0)?;
        let length = usize::from(u16::from_le_bytes(prefix));
        if length < KIND_LEN {
            return Err(ProtocolError::MalformedFrame);
        }

        let mut kind_byte = [0_u8; KIND_LEN];
        read_full(&mut self.stream, &mut kind_byte, LENGTH_PREFIX_LEN)?;
        let [raw_kind] = kind_byte;
        let kind = MessageKind::from(raw_kind);

        let mut payload = vec![0_u8; length - KIND_LEN];
        read_full(&mut self.stream, &mut payload, LENGTH_PREFIX_LEN + KIND_LEN)?;
        trace!(target: "simlink::channel", %kind, len = payload.len(), "frame received");
        Ok(Frame { kind, payload })
    }
}

/// Serialises one frame into a contiguous buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] when the payload does not fit.
pub fn encode_frame(kind: MessageKind, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let length = u16::try_from(payload.len() + KIND_LEN)
        .map_err(|_| ProtocolError::FrameTooLarge { size: payload.len() })?;
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_LEN + usize::from(length));
    frame.extend_from_slice(&length.to_le_bytes());
    frame.push(u8::from(kind));
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Fills `buf` completely, looping over short reads.
///
/// `consumed` counts the bytes of the current frame read before `buf`. A
/// deadline that elapses after any byte of the frame has been read leaves the
/// stream mid-frame and is reported as [`ProtocolError::Desynchronised`].
fn read_full<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    consumed: usize,
) -> Result<(), ProtocolError> {
    let mut filled = 0;
    while let Some(remaining) = buf.get_mut(filled..).filter(|rest| !rest.is_empty()) {
        match reader.read(remaining) {
            Ok(0) => return Err(ProtocolError::ConnectionClosed),
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(read_error(error, consumed + filled)),
        }
    }
    Ok(())
}

fn read_error(error: io::Error, consumed: usize) -> ProtocolError {
    match ProtocolError::from_io(error) {
        ProtocolError::Timeout { source } if consumed > 0 => {
            ProtocolError::Desynchronised { consumed, source }
        }
        other => other,
    }
}
