//! Request and response envelopes exchanged over the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A single command request.
///
/// `id` is an opaque correlation token chosen by the caller; it is never
/// empty on a valid request and the server echoes it on the response.
/// `command` is a namespaced name such as `contacts.search`. `args` may be
/// omitted on the wire and defaults to empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Correlation token echoed on the response.
    pub id: String,
    /// Namespaced command name (`namespace.verb`).
    pub command: String,
    /// Named arguments for the command.
    #[serde(default)]
    pub args: BTreeMap<String, Value>,
}

impl Request {
    /// Builds a request with no arguments.
    #[must_use]
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            args: BTreeMap::new(),
        }
    }

    /// Adds a named argument, returning the modified request.
    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}

/// A single command response.
///
/// Exactly one of `data`/`error` is present on the wire, and `error` is
/// present iff `success` is false. The constructors below are the only way
/// to build a response, so the invariant holds everywhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// Correlation token copied from the request (or the fallback sentinel
    /// when the request never parsed).
    pub id: String,
    /// Whether the command succeeded.
    pub success: bool,
    /// Result payload, present iff `success` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human-readable failure text, present iff `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Builds a successful response carrying `data`.
    #[must_use]
    pub fn ok(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Builds a failed response carrying an error message.
    #[must_use]
    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_args_default_to_empty() {
        let request: Request =
            serde_json::from_str(r#"{"id":"1","command":"ping"}"#).expect("decode");
        assert_eq!(request.id, "1");
        assert_eq!(request.command, "ping");
        assert!(request.args.is_empty());
    }

    #[test]
    fn request_round_trips_with_args() {
        let request = Request::new("7", "contacts.search").with_arg("query", "ada");
        let encoded = serde_json::to_string(&request).expect("encode");
        let decoded: Request = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, request);
    }

    #[test]
    fn success_response_omits_error_field() {
        let response = Response::ok("1", Value::map([("pong", Value::Bool(true))]));
        let encoded = serde_json::to_string(&response).expect("encode");
        assert!(encoded.contains(r#""success":true"#));
        assert!(encoded.contains(r#""pong":true"#));
        assert!(!encoded.contains("error"));
    }

    #[test]
    fn failure_response_omits_data_field() {
        let response = Response::failure("1", "Unknown command: bogus");
        let encoded = serde_json::to_string(&response).expect("encode");
        assert!(encoded.contains(r#""success":false"#));
        assert!(encoded.contains("Unknown command: bogus"));
        assert!(!encoded.contains("data"));
    }
}
