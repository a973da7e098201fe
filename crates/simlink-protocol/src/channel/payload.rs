//! Payload layouts for each message kind.
//!
//! - `Command`: UTF-8 text followed by a NUL byte.
//! - `Result`: `i32 LE byteLength`, then `byteLength` bytes of UTF-8 text
//!   whose final byte is the NUL terminator.
//! - `ApiVersion`: `u32 LE` version in both directions.

use crate::error::ProtocolError;

const TERMINATOR: u8 = 0;

/// Encodes command text as a NUL-terminated payload.
#[must_use]
pub fn encode_command_payload(text: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(text.len() + 1);
    payload.extend_from_slice(text.as_bytes());
    payload.push(TERMINATOR);
    payload
}

/// Decodes a NUL-terminated command payload into its text.
///
/// # Errors
///
/// Returns [`ProtocolError::Parse`] for invalid UTF-8.
pub fn decode_command_payload(payload: &[u8]) -> Result<&str, ProtocolError> {
    let text = payload.strip_suffix(&[TERMINATOR]).unwrap_or(payload);
    std::str::from_utf8(text)
        .map_err(|error| ProtocolError::parse(format!("command payload is not UTF-8: {error}")))
}

/// Encodes result text with its length prefix and terminator.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] when the text length does not
/// fit the signed 32-bit prefix.
pub fn encode_result_payload(text: &str) -> Result<Vec<u8>, ProtocolError> {
    let body_len = text.len() + 1;
    let prefix =
        i32::try_from(body_len).map_err(|_| ProtocolError::FrameTooLarge { size: body_len })?;
    let mut payload = Vec::with_capacity(4 + body_len);
    payload.extend_from_slice(&prefix.to_le_bytes());
    payload.extend_from_slice(text.as_bytes());
    payload.push(TERMINATOR);
    Ok(payload)
}

/// Extracts the result text from a `Result` payload.
///
/// # Errors
///
/// Returns [`ProtocolError::Parse`] when the prefix is missing, negative, or
/// larger than the bytes present, or when the text is not UTF-8.
pub fn decode_result_payload(payload: &[u8]) -> Result<&str, ProtocolError> {
    let (prefix, rest) = payload
        .split_first_chunk::<4>()
        .ok_or_else(|| ProtocolError::parse("result payload is missing its length prefix"))?;
    let declared = i32::from_le_bytes(*prefix);
    let body_len = usize::try_from(declared).map_err(|_| {
        ProtocolError::parse(format!("result payload declares negative length {declared}"))
    })?;
    let body = rest.get(..body_len).ok_or_else(|| {
        ProtocolError::parse(format!(
            "result payload declares {body_len} bytes but only {} are present",
            rest.len()
        ))
    })?;
    let text = body.strip_suffix(&[TERMINATOR]).unwrap_or(body);
    std::str::from_utf8(text)
        .map_err(|error| ProtocolError::parse(format!("result payload is not UTF-8: {error}")))
}

/// Encodes a protocol version.
#[must_use]
pub const fn encode_version(version: u32) -> [u8; 4] {
    version.to_le_bytes()
}

/// Decodes a protocol version.
///
/// # Errors
///
/// Returns [`ProtocolError::Parse`] when fewer than four bytes are present.
pub fn decode_version(payload: &[u8]) -> Result<u32, ProtocolError> {
    payload
        .first_chunk::<4>()
        .map(|bytes| u32::from_le_bytes(*bytes))
        .ok_or_else(|| {
            ProtocolError::parse(format!(
                "version payload has {} bytes, expected 4",
                payload.len()
            ))
        })
}
