//! Wire protocol shared between the Valet daemon and its clients.
//!
//! Messages are UTF-8 JSON objects, one per line, newline-terminated in both
//! directions. A client sends a [`Request`] and receives exactly one
//! correlated [`Response`]. All argument and result data crosses the wire as
//! the closed [`Value`] union; neither side ever exchanges language-native
//! structures directly.

mod envelope;
mod value;
mod wire;

pub use envelope::{Request, Response};
pub use value::{Value, ValueTag};
pub use wire::{FRAME_DELIMITER, UNKNOWN_ID, WireError, decode_request, decode_response, encode_line};
