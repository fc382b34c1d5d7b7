//! HTTP Server
//!
//! Accepts connections and serves each on its own thread.

use std::io::{BufReader, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{encode_response, read_request, HttpResponse, Status};
use super::connection::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a rejected client gets to send its request
const REJECT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// HTTP server for SnapKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,

    /// Connections currently being served
    active: Arc<AtomicUsize>,

    /// Connections not yet reaped
    workers: Mutex<Vec<Worker>>,
}

/// A connection thread plus a handle to its socket
struct Worker {
    thread: JoinHandle<()>,
    stream: TcpStream,
}

impl Server {
    /// Bind the listen address from `config`
    ///
    /// Failing to bind is the one fatal error of the system.
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop until `shutdown` is called (blocking)
    pub fn run(&self) -> Result<()> {
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = self.dispatch(stream) {
                        tracing::warn!("Could not serve connection from {}: {}", addr, e);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }

            self.workers.lock().retain(|worker| !worker.thread.is_finished());
        }

        tracing::info!("Server shutting down, waiting for open connections");
        let workers = std::mem::take(&mut *self.workers.lock());

        // Closing the read side wakes connections idling between requests;
        // a response already being written still goes out
        for worker in &workers {
            let _ = worker.stream.shutdown(Shutdown::Read);
        }
        for worker in workers {
            let _ = worker.thread.join();
        }

        Ok(())
    }

    /// Signal the accept loop to stop
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    fn dispatch(&self, stream: TcpStream) -> Result<()> {
        // Accepted sockets may inherit the listener's non-blocking flag
        stream.set_nonblocking(false)?;

        if self.active.load(Ordering::Relaxed) >= self.config.max_connections {
            tracing::warn!(
                "Rejecting connection: {} connections already open",
                self.config.max_connections
            );
            reject(stream);
            return Ok(());
        }

        let control = stream.try_clone()?;
        let mut connection = Connection::new(stream, Arc::clone(&self.engine))?;
        connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;

        let guard = ActiveGuard::new(Arc::clone(&self.active));
        let thread = thread::Builder::new()
            .name("snapkv-conn".to_string())
            .spawn(move || {
                let _guard = guard;
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
                }
            })?;

        self.workers.lock().push(Worker {
            thread,
            stream: control,
        });
        Ok(())
    }
}

/// Answer 503 and close
///
/// The pending request is read first so closing does not reset the socket
/// before the client sees the response.
fn reject(mut stream: TcpStream) {
    let _ = stream.set_read_timeout(Some(REJECT_READ_TIMEOUT));
    let _ = read_request(&mut BufReader::new(&stream));

    let response = HttpResponse::error(Status::ServiceUnavailable, "too many connections");
    let _ = stream.write_all(&encode_response(&response, false));
    let _ = stream.shutdown(Shutdown::Write);
}

/// Counts a connection as active for as long as it lives
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::Relaxed);
        Self(active)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
