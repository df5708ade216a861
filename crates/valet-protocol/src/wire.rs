//! Newline-framed JSON encoding and decoding.

use serde::Serialize;
use thiserror::Error;

use crate::envelope::{Request, Response};

/// Frame delimiter: one JSON object per line, both directions.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Fallback correlation id used only when a request failed to parse.
pub const UNKNOWN_ID: &str = "unknown";

/// Errors surfaced while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// A message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    /// An incoming line was empty or whitespace-only.
    #[error("empty message line")]
    EmptyLine,
    /// An incoming line was not valid JSON matching the expected schema.
    #[error("malformed message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encodes a message as a single newline-terminated JSON line.
///
/// Compact JSON encoding never emits raw newlines, so the result is always
/// exactly one frame.
///
/// # Errors
///
/// Returns [`WireError::Encode`] when serialization fails.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, WireError> {
    let mut line = serde_json::to_string(message).map_err(WireError::Encode)?;
    line.push(char::from(FRAME_DELIMITER));
    Ok(line)
}

/// Decodes one framed line into a [`Request`].
///
/// Trailing whitespace, including the frame delimiter, is ignored.
///
/// # Errors
///
/// Returns [`WireError::EmptyLine`] for blank input and [`WireError::Decode`]
/// for anything that is not a valid request object.
pub fn decode_request(line: &[u8]) -> Result<Request, WireError> {
    serde_json::from_slice(trimmed(line)?).map_err(WireError::Decode)
}

/// Decodes one framed line into a [`Response`].
///
/// # Errors
///
/// Returns [`WireError::EmptyLine`] for blank input and [`WireError::Decode`]
/// for anything that is not a valid response object.
pub fn decode_response(line: &[u8]) -> Result<Response, WireError> {
    serde_json::from_slice(trimmed(line)?).map_err(WireError::Decode)
}

fn trimmed(line: &[u8]) -> Result<&[u8], WireError> {
    let end = line
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(0, |position| position + 1);
    let trimmed = line.get(..end).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(WireError::EmptyLine);
    }
    Ok(trimmed)
}
