use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;

use valet_config::{Capability, Config, LogFormat, SocketEndpoint};

/// Local capability daemon.
#[derive(Debug, Parser)]
#[command(name = "valetd", version, about)]
struct Cli {
    /// Endpoint to listen on (`unix:///path` or `tcp://host:port`).
    #[arg(long, env = "VALETD_SOCKET")]
    socket: Option<SocketEndpoint>,

    /// Tracing filter expression, e.g. `info` or `valetd::dispatch=debug`.
    #[arg(long, env = "VALETD_LOG")]
    log_filter: Option<String>,

    /// Log output format (`json` or `compact`).
    #[arg(long, env = "VALETD_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path of the persisted settings store. Settings stay in memory when
    /// unset.
    #[arg(long, env = "VALETD_STORE")]
    store_path: Option<Utf8PathBuf>,

    /// Deny access to a capability (repeatable).
    #[arg(long = "deny", value_name = "CAPABILITY")]
    deny: Vec<Capability>,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::default().with_denied(self.deny);
        if let Some(socket) = self.socket {
            config = config.with_socket(socket);
        }
        if let Some(filter) = self.log_filter {
            config = config.with_log_filter(filter);
        }
        if let Some(format) = self.log_format {
            config = config.with_log_format(format);
        }
        if let Some(path) = self.store_path {
            config = config.with_store_path(path);
        }
        config
    }
}

fn main() -> ExitCode {
    let config = Cli::parse().into_config();
    match valetd::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("valetd: {error}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "valetd",
            "--socket",
            "tcp://127.0.0.1:7782",
            "--log-filter",
            "debug",
            "--log-format",
            "compact",
            "--deny",
            "contacts",
            "--deny",
            "calendar",
        ]);
        let config = cli.into_config();
        assert_eq!(config.socket, SocketEndpoint::tcp("127.0.0.1", 7782));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(
            config.denied,
            vec![Capability::Contacts, Capability::Calendar]
        );
    }

    #[test]
    fn defaults_survive_an_empty_invocation() {
        let config = Cli::parse_from(["valetd"]).into_config();
        assert_eq!(config, Config::default());
    }
}
