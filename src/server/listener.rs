use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::connection::Connection;
use crate::http::handler::{Handler, SharedHandler};

/// Pause before accepting again after a transient failure.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Tunables for the connection workers.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Terminate every response body with CRLF.
    pub line_terminated_bodies: bool,
}

impl From<&ServerConfig> for ServerOptions {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            line_terminated_bodies: cfg.line_terminated_bodies,
        }
    }
}

/// Lifecycle of a [`Server`]. Moves forward only.
enum ServerState {
    Idle,
    Listening(Arc<TcpListener>),
    Closed,
}

/// Accepts connections and hands each one to its own worker task.
///
/// The server owns its handler chain, passed in at construction; there is no
/// process-wide default router.
pub struct Server {
    handler: SharedHandler,
    options: ServerOptions,
    state: Mutex<ServerState>,
    connections: Arc<ConnectionSet>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self::with_options(handler, ServerOptions::default())
    }

    pub fn with_options(handler: impl Handler + 'static, options: ServerOptions) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            handler: Arc::new(handler),
            options,
            state: Mutex::new(ServerState::Idle),
            connections: Arc::new(ConnectionSet::default()),
            shutdown,
        }
    }

    /// Binds the listening socket, unless the server is already listening.
    ///
    /// Returns the bound address, which is how callers learn the port when
    /// binding to port 0.
    pub async fn bind(&self, addr: &str) -> Result<SocketAddr, ServerError> {
        match &*self.state() {
            ServerState::Listening(listener) => {
                return listener.local_addr().map_err(|source| ServerError::Bind {
                    addr: addr.to_string(),
                    source,
                });
            }
            ServerState::Closed => return Err(ServerError::AlreadyClosed),
            ServerState::Idle => {}
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        let mut state = self.state();
        match &*state {
            // Lost a race with another bind; keep the first listener.
            ServerState::Listening(existing) => {
                return existing.local_addr().map_err(|source| ServerError::Bind {
                    addr: addr.to_string(),
                    source,
                });
            }
            ServerState::Closed => return Err(ServerError::AlreadyClosed),
            ServerState::Idle => *state = ServerState::Listening(Arc::new(listener)),
        }

        info!("Listening on {}", local);
        Ok(local)
    }

    /// Binds `addr` if needed and serves until [`close`](Self::close) is
    /// called or accepting fails for good.
    pub async fn listen_and_serve(&self, addr: &str) -> Result<(), ServerError> {
        self.bind(addr).await?;
        self.serve().await
    }

    /// Runs the accept loop on the bound socket.
    ///
    /// Transient accept failures are logged and retried. Any other failure
    /// ends the loop and is returned. Returns `Ok(())` once the server is
    /// closed.
    pub async fn serve(&self) -> Result<(), ServerError> {
        let listener = match &*self.state() {
            ServerState::Listening(listener) => Arc::clone(listener),
            ServerState::Idle => return Err(ServerError::NotListening),
            ServerState::Closed => return Err(ServerError::AlreadyClosed),
        };
        let mut shutdown = self.shutdown.subscribe();

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                _ = shutdown.changed() => break,

                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => self.spawn_worker(socket, peer),
                    Err(e) if is_transient(&e) => {
                        warn!(error = %e, "Cannot accept connection, retrying");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                        return Err(ServerError::Accept(e));
                    }
                },
            }
        }

        debug!("Accept loop stopped");
        Ok(())
    }

    /// Closes the listening socket and every live connection.
    ///
    /// All sockets are attempted; failures are collected into
    /// [`ServerError::Close`]. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), ServerError> {
        {
            let mut state = self.state();
            if matches!(*state, ServerState::Closed) {
                return Ok(());
            }
            *state = ServerState::Closed;
        }
        self.shutdown.send_replace(true);

        let errors = self.connections.shutdown_all();
        info!("Server closed");

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServerError::Close(errors))
        }
    }

    /// The bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state() {
            ServerState::Listening(listener) => listener.local_addr().ok(),
            _ => None,
        }
    }

    /// Number of connections currently being served.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn spawn_worker(&self, socket: TcpStream, peer: SocketAddr) {
        let (socket, id) = match self.connections.track(socket) {
            Ok(tracked) => tracked,
            Err(e) if e.kind() == io::ErrorKind::ConnectionAborted => {
                debug!(peer = %peer, "Refusing connection accepted during close");
                return;
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Dropping connection that cannot be tracked");
                return;
            }
        };
        debug!(peer = %peer, "Accepted connection");

        let handler = Arc::clone(&self.handler);
        let connections = Arc::clone(&self.connections);
        let line_terminated = self.options.line_terminated_bodies;

        tokio::spawn(async move {
            let mut conn = Connection::new(socket, handler).line_terminated(line_terminated);
            if let Err(e) = conn.run().await {
                debug!(peer = %peer, error = %e, "Connection ended with error");
            }
            connections.remove(id);
            debug!(peer = %peer, "Connection closed");
        });
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Live connections, kept as cloned socket handles so they can be shut down
/// from outside their worker.
#[derive(Default)]
struct ConnectionSet {
    next_id: AtomicU64,
    tracked: Mutex<Tracked>,
}

#[derive(Default)]
struct Tracked {
    /// Set by `shutdown_all`; later sockets are refused.
    closed: bool,
    sockets: HashMap<u64, std::net::TcpStream>,
}

impl ConnectionSet {
    /// Registers an accepted socket, or shuts it down if the set was already
    /// closed.
    fn track(&self, socket: TcpStream) -> io::Result<(TcpStream, u64)> {
        let std_socket = socket.into_std()?;
        let handle = std_socket.try_clone()?;
        let socket = TcpStream::from_std(std_socket)?;

        let mut tracked = self.lock();
        if tracked.closed {
            handle.shutdown(Shutdown::Both).ok();
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "server is closed",
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracked.sockets.insert(id, handle);
        Ok((socket, id))
    }

    fn remove(&self, id: u64) {
        self.lock().sockets.remove(&id);
    }

    fn len(&self) -> usize {
        self.lock().sockets.len()
    }

    fn shutdown_all(&self) -> Vec<io::Error> {
        let sockets: Vec<_> = {
            let mut tracked = self.lock();
            tracked.closed = true;
            tracked.sockets.drain().map(|(_, s)| s).collect()
        };

        sockets
            .into_iter()
            .filter_map(|socket| match socket.shutdown(Shutdown::Both) {
                Ok(()) => None,
                Err(e) if e.kind() == io::ErrorKind::NotConnected => None,
                Err(e) => Some(e),
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Tracked> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Accept errors that concern one connection attempt or a momentary resource
/// shortage rather than the listener itself.
fn is_transient(e: &io::Error) -> bool {
    const EMFILE: i32 = 24;
    const ENFILE: i32 = 23;

    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) || matches!(e.raw_os_error(), Some(EMFILE) | Some(ENFILE))
}
