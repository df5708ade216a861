//! One-shot client runtime for the valet daemon.
//!
//! The module owns argument parsing, request construction, daemon transport,
//! and response rendering. Each invocation sends exactly one request and
//! prints its answer: exit 0 for daemon success, 1 for a daemon-reported
//! failure, 2 for usage and transport errors. The runtime is exercised both
//! from the binary entrypoint and from tests that substitute the IO streams.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::process::{self, ExitCode};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use clap::error::ErrorKind;

use valet_config::default_socket_endpoint;
use valet_protocol::{Request, decode_response, encode_line};

mod args;
mod cli;
mod errors;
mod output;
mod transport;

use args::parse_arguments;
use cli::Cli;
pub use errors::AppError;
use output::render;
use transport::connect;

const SUCCESS_EXIT: u8 = 0;
const DAEMON_FAILURE_EXIT: u8 = 1;
const USAGE_EXIT: u8 = 2;

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    ExitCode::from(run_inner(args, stdout, stderr))
}

fn run_inner<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> u8
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };
    match execute(&cli, stdout, stderr) {
        Ok(status) => status,
        Err(error) => {
            let _ = writeln!(stderr, "valet: {error}");
            USAGE_EXIT
        }
    }
}

fn report_usage<W, E>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> u8
where
    W: Write,
    E: Write,
{
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(stdout, "{error}");
            SUCCESS_EXIT
        }
        _ => {
            let _ = write!(stderr, "{error}");
            USAGE_EXIT
        }
    }
}

fn execute<W, E>(cli: &Cli, stdout: &mut W, stderr: &mut E) -> Result<u8, AppError>
where
    W: Write,
    E: Write,
{
    let request = Request {
        id: cli.id.clone().unwrap_or_else(generated_id),
        command: cli.command.clone(),
        args: parse_arguments(&cli.arguments)?,
    };
    let endpoint = cli.socket.clone().unwrap_or_else(default_socket_endpoint);

    let mut connection = connect(&endpoint)?;
    let line = encode_line(&request).map_err(AppError::EncodeRequest)?;
    connection
        .write_all(line.as_bytes())
        .map_err(AppError::SendRequest)?;
    connection.flush().map_err(AppError::SendRequest)?;

    let mut reader = BufReader::new(connection);
    let mut response_line = String::new();
    let read = reader
        .read_line(&mut response_line)
        .map_err(AppError::ReadResponse)?;
    if read == 0 {
        return Err(AppError::ClosedWithoutResponse);
    }
    let response = decode_response(response_line.as_bytes()).map_err(AppError::ParseResponse)?;
    if response.id != request.id {
        return Err(AppError::CorrelationMismatch {
            expected: request.id,
            received: response.id,
        });
    }

    render(&response, cli.json, stdout, stderr)
}

/// Correlation id used when `--id` is omitted; unique enough for a one-shot
/// exchange over a dedicated connection.
fn generated_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("valet-{}-{nanos}", process::id())
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use valet_protocol::{Response, Value, decode_request};

    use super::*;

    /// Single-exchange daemon stand-in answering with `respond`.
    fn fake_daemon<F>(respond: F) -> (String, JoinHandle<()>)
    where
        F: FnOnce(Request) -> Response + Send + 'static,
    {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut line = String::new();
            BufReader::new(stream.try_clone().expect("clone"))
                .read_line(&mut line)
                .expect("read request");
            let request = decode_request(line.as_bytes()).expect("decode request");
            let reply = encode_line(&respond(request)).expect("encode response");
            stream.write_all(reply.as_bytes()).expect("write response");
        });
        (format!("tcp://{addr}"), handle)
    }

    fn run_cli(argv: &[&str]) -> (u8, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run_inner(argv.iter().map(|arg| OsString::from(*arg)), &mut stdout, &mut stderr);
        (
            status,
            String::from_utf8(stdout).expect("stdout utf8"),
            String::from_utf8(stderr).expect("stderr utf8"),
        )
    }

    #[test]
    fn a_successful_exchange_prints_the_data() {
        let (socket, daemon) = fake_daemon(|request| {
            assert_eq!(request.command, "ping");
            Response::ok(&request.id, Value::map([("pong", Value::Bool(true))]))
        });

        let (status, stdout, stderr) = run_cli(&["valet", "--socket", &socket, "ping"]);
        daemon.join().expect("daemon join");

        assert_eq!(status, SUCCESS_EXIT);
        assert!(stdout.contains("\"pong\": true"));
        assert!(stderr.is_empty());
    }

    #[test]
    fn key_value_pairs_arrive_typed() {
        let (socket, daemon) = fake_daemon(|request| {
            assert_eq!(request.command, "contacts.list");
            assert_eq!(request.args.get("limit"), Some(&Value::Int(5)));
            Response::ok(&request.id, Value::list([]))
        });

        let (status, _, _) = run_cli(&["valet", "--socket", &socket, "contacts.list", "limit=5"]);
        daemon.join().expect("daemon join");
        assert_eq!(status, SUCCESS_EXIT);
    }

    #[test]
    fn an_explicit_id_is_forwarded() {
        let (socket, daemon) = fake_daemon(|request| {
            assert_eq!(request.id, "req-42");
            Response::ok(&request.id, Value::Null)
        });

        let (status, _, _) = run_cli(&["valet", "--socket", &socket, "--id", "req-42", "status"]);
        daemon.join().expect("daemon join");
        assert_eq!(status, SUCCESS_EXIT);
    }

    #[test]
    fn a_daemon_failure_maps_to_exit_one() {
        let (socket, daemon) =
            fake_daemon(|request| Response::failure(&request.id, "Unknown command: bogus"));

        let (status, stdout, stderr) = run_cli(&["valet", "--socket", &socket, "bogus"]);
        daemon.join().expect("daemon join");

        assert_eq!(status, DAEMON_FAILURE_EXIT);
        assert!(stdout.is_empty());
        assert!(stderr.contains("Unknown command: bogus"));
    }

    #[test]
    fn a_mismatched_correlation_id_is_a_transport_error() {
        let (socket, daemon) = fake_daemon(|_| Response::ok("someone-else", Value::Null));

        let (status, _, stderr) = run_cli(&["valet", "--socket", &socket, "ping"]);
        daemon.join().expect("daemon join");

        assert_eq!(status, USAGE_EXIT);
        assert!(stderr.contains("does not match request id"));
    }

    #[test]
    fn malformed_pairs_fail_before_connecting() {
        let (status, _, stderr) =
            run_cli(&["valet", "--socket", "tcp://127.0.0.1:1", "contacts.search", "query"]);
        assert_eq!(status, USAGE_EXIT);
        assert!(stderr.contains("KEY=VALUE"));
    }

    #[test]
    fn an_unreachable_daemon_is_a_transport_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.sock");
        let socket = format!("unix://{}", path.display());

        let (status, _, stderr) = run_cli(&["valet", "--socket", &socket, "ping"]);
        assert_eq!(status, USAGE_EXIT);
        assert!(stderr.contains("failed to connect"));
    }
}
