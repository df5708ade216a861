//! Connection handler that serves newline-framed JSON requests.
//!
//! Each connection runs on its own thread and is served until the peer
//! disconnects: the handler accumulates bytes into a line buffer, decodes one
//! request per line, routes it, and writes exactly one response line back.
//! Malformed lines are answered with a protocol error and the connection
//! stays open; only oversized requests and IO failures close it.

use std::io::{self, Read, Write};

use tracing::{debug, warn};

use valet_protocol::{FRAME_DELIMITER, Response, UNKNOWN_ID, WireError, decode_request, encode_line};

use crate::transport::{ConnectionHandler, ConnectionStream};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::router::Router;

/// Maximum size of a single request line in bytes.
pub(crate) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Connection handler that parses and dispatches framed requests.
#[derive(Debug)]
pub struct DispatchConnectionHandler {
    router: Router,
}

impl DispatchConnectionHandler {
    /// Creates a handler over the given router.
    pub const fn new(router: Router) -> Self {
        Self { router }
    }

    fn serve(&self, mut stream: ConnectionStream) {
        let mut buffer = LineBuffer::default();
        loop {
            let line = match buffer.next_line(&mut stream) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!(target: DISPATCH_TARGET, "client disconnected");
                    return;
                }
                Err(error @ DispatchError::RequestTooLarge { .. }) => {
                    warn!(target: DISPATCH_TARGET, %error, "request exceeds frame limit");
                    let response = Response::failure(UNKNOWN_ID, error.to_string());
                    let _ = write_response(&mut stream, &response);
                    return;
                }
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                    return;
                }
            };

            let response = match decode_request(&line) {
                Ok(request) if request.id.is_empty() => {
                    warn!(target: DISPATCH_TARGET, "request with empty id");
                    Response::failure(
                        UNKNOWN_ID,
                        DispatchError::protocol("request id must not be empty", None).to_string(),
                    )
                }
                Ok(request) => self.router.handle(&request),
                Err(WireError::EmptyLine) => continue,
                Err(WireError::Decode(source) | WireError::Encode(source)) => {
                    warn!(target: DISPATCH_TARGET, error = %source, "malformed request");
                    let message = source.to_string();
                    Response::failure(
                        UNKNOWN_ID,
                        DispatchError::protocol(message, Some(source)).to_string(),
                    )
                }
            };

            if let Err(error) = write_response(&mut stream, &response) {
                warn!(target: DISPATCH_TARGET, %error, "failed to write response");
                return;
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.serve(stream);
    }
}

fn write_response(stream: &mut ConnectionStream, response: &Response) -> io::Result<()> {
    let line = encode_line(response)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    stream.write_all(line.as_bytes())?;
    stream.flush()
}

/// Accumulates stream bytes across reads and yields one frame at a time.
///
/// Bytes beyond the first delimiter are retained for the next call, so a
/// single read carrying several pipelined requests yields them in order.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Yields the next complete line, or `Ok(None)` once the peer disconnects.
    ///
    /// A trailing partial line at EOF is yielded as-is so a final unterminated
    /// request is still answered.
    fn next_line(&mut self, stream: &mut ConnectionStream) -> Result<Option<Vec<u8>>, DispatchError> {
        let mut chunk = [0_u8; 1024];
        loop {
            if let Some(position) = self.pending.iter().position(|byte| *byte == FRAME_DELIMITER) {
                let mut line: Vec<u8> = self.pending.drain(..=position).collect();
                line.pop();
                return Ok(Some(line));
            }
            if self.pending.len() > MAX_REQUEST_BYTES {
                let size = self.pending.len();
                self.pending.clear();
                return Err(DispatchError::RequestTooLarge {
                    size,
                    max: MAX_REQUEST_BYTES,
                });
            }

            let bytes_read = read_with_retry(stream, &mut chunk)?;
            if bytes_read == 0 {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }
            self.pending.extend_from_slice(&chunk[..bytes_read]);
        }
    }
}

/// Reads from the stream, retrying on interrupts.
fn read_with_retry(stream: &mut ConnectionStream, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    use rstest::{fixture, rstest};

    use valet_protocol::{Value, decode_response};

    use crate::capability::{Backends, PolicyResolver};

    use super::*;

    /// Test fixture holding one live client connection to an in-thread server.
    struct HandlerTestHarness {
        writer: TcpStream,
        reader: BufReader<TcpStream>,
        server_handle: JoinHandle<()>,
    }

    impl HandlerTestHarness {
        /// Sends raw bytes without waiting for a response.
        fn send(&mut self, bytes: &[u8]) {
            self.writer.write_all(bytes).expect("write request");
            self.writer.flush().expect("flush");
        }

        /// Reads the next response line from the connection.
        fn next_response(&mut self) -> Response {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).expect("read response");
            assert!(read > 0, "connection closed before a response arrived");
            decode_response(line.as_bytes()).expect("decode response")
        }

        /// Sends one request line and reads its response.
        fn roundtrip(&mut self, request: &[u8]) -> Response {
            self.send(request);
            self.next_response()
        }

        /// Closes the connection and waits for the server thread.
        fn finish(self) {
            let Self {
                writer,
                reader,
                server_handle,
            } = self;
            drop(writer);
            drop(reader);
            server_handle.join().expect("server join");
        }
    }

    fn create_listener() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        (listener, addr)
    }

    #[fixture]
    fn harness() -> HandlerTestHarness {
        let (listener, addr) = create_listener();
        let server_handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let backends =
                Backends::new(Arc::new(PolicyResolver::default()), None).expect("registry");
            DispatchConnectionHandler::new(Router::new(backends))
                .handle(ConnectionStream::Tcp(stream));
        });

        let writer = TcpStream::connect(addr).expect("connect");
        let reader = BufReader::new(writer.try_clone().expect("clone stream"));
        HandlerTestHarness {
            writer,
            reader,
            server_handle,
        }
    }

    #[rstest]
    fn a_connection_serves_sequential_requests(mut harness: HandlerTestHarness) {
        let first = harness.roundtrip(b"{\"id\":\"a\",\"command\":\"ping\"}\n");
        assert!(first.success);
        assert_eq!(first.id, "a");

        let second = harness.roundtrip(b"{\"id\":\"b\",\"command\":\"status\"}\n");
        assert!(second.success);
        assert_eq!(second.id, "b");

        harness.finish();
    }

    #[rstest]
    fn malformed_lines_are_answered_and_the_connection_survives(mut harness: HandlerTestHarness) {
        let failure = harness.roundtrip(b"not valid json\n");
        assert!(!failure.success);
        assert_eq!(failure.id, "unknown");
        assert!(
            failure
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with("Protocol error:"))
        );

        let recovered = harness.roundtrip(b"{\"id\":\"after\",\"command\":\"ping\"}\n");
        assert!(recovered.success);
        assert_eq!(recovered.id, "after");

        harness.finish();
    }

    #[rstest]
    fn blank_lines_are_skipped(mut harness: HandlerTestHarness) {
        let response = harness.roundtrip(b"\n  \n{\"id\":\"p\",\"command\":\"ping\"}\n");
        assert!(response.success);
        assert_eq!(response.id, "p");

        harness.finish();
    }

    #[rstest]
    fn an_empty_request_id_is_answered_with_the_sentinel(mut harness: HandlerTestHarness) {
        let response = harness.roundtrip(b"{\"id\":\"\",\"command\":\"ping\"}\n");
        assert!(!response.success);
        assert_eq!(response.id, "unknown");
        assert_eq!(
            response.error.as_deref(),
            Some("Protocol error: request id must not be empty")
        );

        harness.finish();
    }

    #[rstest]
    fn unknown_commands_keep_the_connection_alive(mut harness: HandlerTestHarness) {
        let failure = harness.roundtrip(b"{\"id\":\"1\",\"command\":\"bogus\"}\n");
        assert!(!failure.success);
        assert_eq!(failure.error.as_deref(), Some("Unknown command: bogus"));

        let probe = harness.roundtrip(b"{\"id\":\"2\",\"command\":\"ping\"}\n");
        assert!(probe.success);

        harness.finish();
    }

    #[rstest]
    fn missing_arguments_are_reported(mut harness: HandlerTestHarness) {
        let response = harness.roundtrip(b"{\"id\":\"1\",\"command\":\"contacts.search\"}\n");
        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("Missing required argument: query")
        );

        harness.finish();
    }

    #[rstest]
    fn a_request_split_across_writes_is_reassembled(mut harness: HandlerTestHarness) {
        harness.send(b"{\"id\":\"split\",\"com");
        harness.send(b"mand\":\"ping\"}\n");
        let response = harness.next_response();
        assert!(response.success);
        assert_eq!(response.id, "split");

        harness.finish();
    }

    #[rstest]
    fn pipelined_requests_are_answered_in_order(mut harness: HandlerTestHarness) {
        harness.send(b"{\"id\":\"1\",\"command\":\"ping\"}\n{\"id\":\"2\",\"command\":\"ping\"}\n");
        assert_eq!(harness.next_response().id, "1");
        assert_eq!(harness.next_response().id, "2");

        harness.finish();
    }

    #[rstest]
    fn state_persists_across_requests_on_one_connection(mut harness: HandlerTestHarness) {
        let created = harness.roundtrip(
            b"{\"id\":\"c\",\"command\":\"contacts.create\",\"args\":{\"name\":\"Ada\"}}\n",
        );
        assert!(created.success);
        let id = created
            .data
            .as_ref()
            .and_then(Value::as_map)
            .and_then(|m| m.get("id"))
            .and_then(Value::as_str)
            .expect("contact id")
            .to_owned();

        let fetched = harness.roundtrip(
            format!("{{\"id\":\"g\",\"command\":\"contacts.get\",\"args\":{{\"id\":\"{id}\"}}}}\n")
                .as_bytes(),
        );
        assert!(fetched.success);

        harness.finish();
    }

    #[rstest]
    fn oversized_requests_are_answered_then_disconnected(mut harness: HandlerTestHarness) {
        let oversized = vec![b'a'; MAX_REQUEST_BYTES + 16];
        harness.send(&oversized);

        let response = harness.next_response();
        assert!(!response.success);
        assert_eq!(response.id, "unknown");
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with("Protocol error:"))
        );

        let mut line = String::new();
        assert_eq!(
            harness.reader.read_line(&mut line).expect("read eof"),
            0,
            "connection should close after an oversized request"
        );
        harness.finish();
    }
}
