//! Command-line argument definitions.

use clap::Parser;

use valet_config::SocketEndpoint;

/// One-shot client for the valet daemon.
///
/// Sends a single command and prints the daemon's answer, for example:
/// `valet contacts.search query=ada`.
#[derive(Debug, Parser)]
#[command(name = "valet", version, about)]
pub(crate) struct Cli {
    /// Daemon endpoint (`unix:///path` or `tcp://host:port`).
    #[arg(long, env = "VALET_SOCKET")]
    pub(crate) socket: Option<SocketEndpoint>,

    /// Correlation id for the request; generated when omitted.
    #[arg(long)]
    pub(crate) id: Option<String>,

    /// Print the raw response object instead of the data payload.
    #[arg(long)]
    pub(crate) json: bool,

    /// Command name, for example `ping` or `contacts.search`.
    #[arg(value_name = "COMMAND")]
    pub(crate) command: String,

    /// Arguments as KEY=VALUE pairs. Values parse as JSON, falling back to
    /// plain strings.
    #[arg(value_name = "ARG", num_args = 0.., allow_hyphen_values = true)]
    pub(crate) arguments: Vec<String>,
}
