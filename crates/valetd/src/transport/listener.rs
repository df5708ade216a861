//! Listener that owns the daemon's local endpoint.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use valet_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, ListenerError, TRANSPORT_TARGET};

#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::fd::OwnedFd;
#[cfg(unix)]
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::Path;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Bounded accept backlog shared by both transports.
#[cfg(unix)]
const ACCEPT_BACKLOG: i32 = 128;

/// Listener bound to a socket endpoint.
///
/// Binding reclaims a stale Unix socket file left by an unclean shutdown and
/// refuses to displace a live daemon. The socket file is restricted to the
/// owning user between `bind` and `listen`, so no other local user can
/// connect during the window.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: SocketEndpoint,
    listener: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl SocketListener {
    /// Binds the endpoint without accepting yet.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the endpoint cannot be bound; this is
    /// fatal to the daemon and must not be swallowed.
    pub fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let listener = match endpoint {
            SocketEndpoint::Tcp { host, port } => ListenerKind::Tcp(bind_tcp(host, *port)?),
            SocketEndpoint::Unix { path } => {
                #[cfg(unix)]
                {
                    ListenerKind::Unix(bind_unix(path.as_std_path())?)
                }

                #[cfg(not(unix))]
                {
                    return Err(ListenerError::UnsupportedUnix {
                        endpoint: endpoint.to_string(),
                    });
                }
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Reports the bound TCP address, when applicable.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            ListenerKind::Unix(_) => None,
        }
    }

    /// Starts the accept loop on a background thread.
    ///
    /// Every accepted connection is served by `handler` on a dedicated
    /// thread. The handler is fixed for the listener's lifetime; there is no
    /// late registration.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::NonBlocking`] when the listener cannot be
    /// switched to non-blocking accepts.
    pub fn start(
        mut self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        if let Err(error) = match &self.listener {
            ListenerKind::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            ListenerKind::Unix(listener) => listener.set_nonblocking(true),
        } {
            #[cfg(unix)]
            remove_socket_file(&self.endpoint);
            return Err(ListenerError::NonBlocking { source: error });
        }
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || run_accept_loop(&mut self, &shutdown_flag, handler));
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept loop.
///
/// Shutdown is idempotent: requesting it twice, or after the loop already
/// exited, has no effect. Dropping the handle also requests shutdown.
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Requests the accept loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the loop thread panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        self.shutdown.store(true, Ordering::SeqCst);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &mut SocketListener,
    shutdown: &AtomicBool,
    handler: Arc<dyn ConnectionHandler>,
) {
    info!(
        target: TRANSPORT_TARGET,
        endpoint = %listener.endpoint,
        "listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let handler = Arc::clone(&handler);
                thread::spawn(move || handler.handle(stream));
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(target: TRANSPORT_TARGET, error = %error, "accept error");
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    #[cfg(unix)]
    remove_socket_file(&listener.endpoint);
    info!(target: TRANSPORT_TARGET, endpoint = %listener.endpoint, "listener stopped");
}

fn accept_connection(listener: &SocketListener) -> Result<Option<ConnectionStream>, io::Error> {
    match &listener.listener {
        ListenerKind::Tcp(tcp) => match tcp.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(ConnectionStream::Tcp(stream)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        },
        #[cfg(unix)]
        ListenerKind::Unix(unix) => match unix.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(ConnectionStream::Unix(stream)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        },
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    reclaim_stale_socket(path)?;

    let display = || path.display().to_string();
    let socket =
        Socket::new(Domain::UNIX, Type::STREAM, None).map_err(|source| {
            ListenerError::CreateUnix {
                path: display(),
                source,
            }
        })?;
    let address = SockAddr::unix(path).map_err(|source| ListenerError::BindUnix {
        path: display(),
        source,
    })?;
    socket.bind(&address).map_err(|source| ListenerError::BindUnix {
        path: display(),
        source,
    })?;
    // Owner-only before listen(): nobody else can connect during the window.
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
        ListenerError::RestrictUnix {
            path: display(),
            source,
        }
    })?;
    socket
        .listen(ACCEPT_BACKLOG)
        .map_err(|source| ListenerError::ListenUnix {
            path: display(),
            source,
        })?;
    Ok(UnixListener::from(OwnedFd::from(socket)))
}

/// Removes a leftover socket file, refusing to displace a live daemon.
#[cfg(unix)]
fn reclaim_stale_socket(path: &Path) -> Result<(), ListenerError> {
    if !path.exists() {
        return Ok(());
    }
    let display = || path.display().to_string();
    let metadata = fs::symlink_metadata(path).map_err(|source| ListenerError::UnixMetadata {
        path: display(),
        source,
    })?;
    if !metadata.file_type().is_socket() {
        return Err(ListenerError::UnixNotSocket { path: display() });
    }
    match UnixStream::connect(path) {
        Ok(_stream) => Err(ListenerError::UnixInUse { path: display() }),
        Err(error)
            if error.kind() == io::ErrorKind::ConnectionRefused
                || error.kind() == io::ErrorKind::NotFound =>
        {
            fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                path: display(),
                source,
            })
        }
        Err(source) => Err(ListenerError::UnixProbe {
            path: display(),
            source,
        }),
    }
}

#[cfg(unix)]
fn remove_socket_file(endpoint: &SocketEndpoint) {
    let Some(path) = endpoint.unix_path() else {
        return;
    };
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: TRANSPORT_TARGET,
            error = %error,
            path = %path,
            "failed to remove socket file"
        );
    }
}
