//! Response rendering.
//!
//! Success payloads print to stdout as pretty JSON; daemon-reported failures
//! print to stderr. `--json` emits the whole response object on one line for
//! scripting.

use std::io::Write;

use valet_protocol::{Response, Value};

use super::errors::AppError;
use super::{DAEMON_FAILURE_EXIT, SUCCESS_EXIT};

pub(crate) fn render<W, E>(
    response: &Response,
    raw: bool,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<u8, AppError>
where
    W: Write,
    E: Write,
{
    if raw {
        let line = serde_json::to_string(response).map_err(AppError::RenderResponse)?;
        writeln!(stdout, "{line}").map_err(AppError::WriteOutput)?;
        stdout.flush().map_err(AppError::WriteOutput)?;
        return Ok(exit_status(response));
    }

    if response.success {
        let data = response.data.clone().unwrap_or(Value::Null);
        let rendered = serde_json::to_string_pretty(&data).map_err(AppError::RenderResponse)?;
        writeln!(stdout, "{rendered}").map_err(AppError::WriteOutput)?;
        stdout.flush().map_err(AppError::WriteOutput)?;
    } else {
        let message = response.error.as_deref().unwrap_or("unknown error");
        writeln!(stderr, "error: {message}").map_err(AppError::WriteOutput)?;
        stderr.flush().map_err(AppError::WriteOutput)?;
    }
    Ok(exit_status(response))
}

const fn exit_status(response: &Response) -> u8 {
    if response.success {
        SUCCESS_EXIT
    } else {
        DAEMON_FAILURE_EXIT
    }
}
