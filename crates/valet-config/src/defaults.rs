//! Canonical default locations and settings.

use crate::socket::SocketEndpoint;

#[cfg(unix)]
use camino::Utf8PathBuf;

/// Default TCP port used when Unix domain sockets are unavailable.
pub const DEFAULT_TCP_PORT: u16 = 7782;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Computes the canonical daemon endpoint.
///
/// On Unix this is `$XDG_RUNTIME_DIR/valet/valetd.sock`; without a runtime
/// directory it falls back to a per-user namespace under the system temporary
/// directory (`<tmp>/valet/uid-<euid>/valetd.sock`) so distinct users never
/// share a rendezvous path. Elsewhere a loopback TCP endpoint is used.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    default_socket_endpoint_inner()
}

#[cfg(unix)]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    let base = match runtime_base_directory() {
        Some(mut dir) => {
            dir.push("valet");
            dir
        }
        None => {
            let mut dir = fallback_base_directory();
            dir.push("valet");
            dir.push(user_namespace());
            dir
        }
    };
    SocketEndpoint::unix(base.join("valetd.sock"))
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    dirs::runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: geteuid cannot fail and has no preconditions.
    let uid = unsafe { libc::geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn default_endpoint_is_a_unix_socket_named_valetd() {
        let endpoint = default_socket_endpoint();
        let path = endpoint.unix_path().expect("unix endpoint");
        assert_eq!(path.file_name(), Some("valetd.sock"));
        assert!(path.as_str().contains("valet"));
    }
}
