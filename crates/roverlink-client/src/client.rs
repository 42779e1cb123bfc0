//! The NTRIP client: public API and the background polling loop.
//!
//! One background task evaluates the session state machine on a fixed tick.
//! Every piece of shared state lives in [`ClientInner`] behind a single
//! mutex that is only ever acquired with a bounded wait; a contended tick
//! is skipped and a contended API call returns `Busy` without touching any
//! state. Transitions are atomic with respect to that lock: no caller can
//! observe a half-updated state/error/buffer triple.

use crate::handshake::{self, HandshakeResponse, RESPONSE_BUFFER_SIZE};
use crate::socket::{CasterSocket, SocketErrorKind, SocketProvider, TcpSocketProvider};
use bytes::BytesMut;
use roverlink_core::error::{ClientError, Result};
use roverlink_core::types::{CasterConfig, ClientState, Credentials, DetailedError};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Capacity of the correction-data transfer buffer. Callers must hand
/// `correction_data` a buffer of at least this size.
pub const RECEIVE_DATA_SIZE: usize = 1024;

/// Polling loop tick
const POLL_TICK: Duration = Duration::from_millis(25);

/// Bounded wait for the client lock in the loop and the mutating calls
const LOCK_TIMEOUT: Duration = Duration::from_millis(200);

/// Bounded wait for the read-only snapshot accessors
const SNAPSHOT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Expiry for the GGA-request and unread-correction liveness timers
const FSM_TIMEOUT: Duration = Duration::from_secs(30);

/// Cadence at which a GGA-expecting caster is asked for a fresh position
const GGA_INTERVAL: Duration = Duration::from_secs(10);

/// Write timeout for the handshake request and GGA sentences
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Read timeout for the caster's first response
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared session state, guarded by the one client lock.
struct ClientInner {
    socket: Option<Box<dyn CasterSocket>>,
    socket_valid: bool,
    gga_necessary: bool,
    /// Anchor for the GGA cadence; reset on every successful `send_gga`
    gga_anchor: Instant,
    /// Anchor for the liveness timers; reset on every state entry that arms one
    timeout_anchor: Instant,
    state: ClientState,
    detailed_error: DetailedError,
    recv_buf: BytesMut,
    recv_len: usize,
}

impl ClientInner {
    fn new() -> Self {
        Self {
            socket: None,
            socket_valid: false,
            gga_necessary: false,
            gga_anchor: Instant::now(),
            timeout_anchor: Instant::now(),
            state: ClientState::Ready,
            detailed_error: DetailedError::NoError,
            recv_buf: BytesMut::zeroed(RECEIVE_DATA_SIZE),
            recv_len: 0,
        }
    }
}

/// NTRIP client for one caster session.
///
/// Lifecycle: `set_config` + `set_credentials`, then `init` (handshake and
/// polling task), then react to `state()`: answer `RequestGga` with
/// [`NtripClient::send_gga`] and drain `CorrectionDataAvailable` with
/// [`NtripClient::correction_data`], until `deinit` or a terminal
/// `Error`/`ConnectionReset`, after which the caller must `deinit` and run
/// the full sequence again. There is no built-in reconnect.
pub struct NtripClient {
    provider: Arc<dyn SocketProvider>,
    config: Option<CasterConfig>,
    credentials: Option<Credentials>,
    inner: Arc<Mutex<ClientInner>>,
    poll_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<Sender<()>>,
}

impl Default for NtripClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NtripClient {
    /// Create a client over the operating system's TCP stack.
    pub fn new() -> Self {
        Self::with_provider(Arc::new(TcpSocketProvider))
    }

    /// Create a client over a custom socket provider.
    pub fn with_provider(provider: Arc<dyn SocketProvider>) -> Self {
        Self {
            provider,
            config: None,
            credentials: None,
            inner: Arc::new(Mutex::new(ClientInner::new())),
            poll_task: None,
            shutdown_tx: None,
        }
    }

    /// Set the caster connection parameters for the next `init`.
    ///
    /// Overwriting an already-set config succeeds; the previous value is
    /// replaced wholesale.
    pub fn set_config(&mut self, config: CasterConfig) {
        if self.config.replace(config).is_some() {
            warn!("caster config was already set, overwriting");
        }
    }

    /// Set the credentials for the next `init`. Same overwrite policy as
    /// [`NtripClient::set_config`].
    pub fn set_credentials(&mut self, credentials: Credentials) {
        if self.credentials.replace(credentials).is_some() {
            warn!("credentials were already set, overwriting");
        }
    }

    pub fn config(&self) -> Option<&CasterConfig> {
        self.config.as_ref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Connect to the caster, perform the handshake, and start the polling
    /// task.
    ///
    /// Requires both config and credentials to be set. A still-running
    /// session from a prior `init` is torn down first, so re-init after an
    /// error is always safe. On success the state is `RequestGga` when the
    /// config carries `gga_necessary`, `Ready` otherwise; on any failure
    /// the socket is closed, the state is `Error`, and the detailed error
    /// names the cause.
    pub async fn init(&mut self) -> Result<()> {
        let (config, credentials) = match (&self.config, &self.credentials) {
            (Some(config), Some(credentials)) => (config.clone(), credentials.clone()),
            _ => return Err(ClientError::NotConfigured),
        };

        self.stop_poll_task().await;
        self.cleanup_socket().await;

        info!(
            host = %config.host,
            port = config.port,
            mountpoint = %config.mountpoint,
            "connecting to caster"
        );

        let mut socket = match self.provider.connect(&config.host, config.port).await {
            Ok(socket) => socket,
            Err(e) => return Err(self.fail_init(ClientError::Socket(e), None).await),
        };

        let timeout_anchor = Instant::now();

        let request = handshake::build_request(&config, &credentials);
        if let Err(e) = with_deadline(
            WRITE_TIMEOUT,
            "handshake write timed out",
            socket.write_all(request.as_bytes()),
        )
        .await
        {
            return Err(self.fail_init(ClientError::Socket(e), Some(socket)).await);
        }

        let mut response = [0u8; RESPONSE_BUFFER_SIZE];
        let n = match with_deadline(
            READ_TIMEOUT,
            "handshake read timed out",
            socket.read(&mut response),
        )
        .await
        {
            Ok(n) => n,
            Err(e) => {
                let err = match SocketErrorKind::classify(&e) {
                    SocketErrorKind::ConnectionReset => ClientError::ConnectionReset,
                    _ => ClientError::Socket(e),
                };
                return Err(self.fail_init(err, Some(socket)).await);
            }
        };

        match handshake::classify_response(&response[..n]) {
            HandshakeResponse::Accepted => {}
            HandshakeResponse::SourceTable => {
                warn!(mountpoint = %config.mountpoint, "caster answered with a source table");
                let err = ClientError::InvalidMountpoint {
                    mountpoint: config.mountpoint.clone(),
                };
                return Err(self.fail_init(err, Some(socket)).await);
            }
            HandshakeResponse::Unrecognized => {
                let err = ClientError::UnexpectedResponse {
                    response: String::from_utf8_lossy(&response[..n]).into_owned(),
                };
                return Err(self.fail_init(err, Some(socket)).await);
            }
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let err = ClientError::UnableToCreateTask {
                    reason: e.to_string(),
                };
                return Err(self.fail_init(err, Some(socket)).await);
            }
        };

        let initial_state = if config.gga_necessary {
            ClientState::RequestGga
        } else {
            ClientState::Ready
        };

        {
            let mut inner = self.inner.lock().await;
            inner.socket = Some(socket);
            inner.socket_valid = true;
            inner.gga_necessary = config.gga_necessary;
            inner.gga_anchor = Instant::now();
            inner.timeout_anchor = timeout_anchor;
            inner.state = initial_state;
            inner.detailed_error = DetailedError::NoError;
            inner.recv_len = 0;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);
        self.poll_task = Some(runtime.spawn(poll_loop(Arc::clone(&self.inner), shutdown_rx)));

        info!(state = %initial_state, "caster accepted mountpoint");
        Ok(())
    }

    /// Send a GGA position sentence to the caster.
    ///
    /// On success the GGA cadence restarts and the state returns to
    /// `Ready`. A failed write is a session failure (`Error` +
    /// `SocketError`); a contended lock returns `Busy` without touching
    /// any state.
    pub async fn send_gga(&mut self, sentence: &[u8]) -> Result<()> {
        let mut inner = timeout(LOCK_TIMEOUT, self.inner.lock())
            .await
            .map_err(|_| ClientError::Busy)?;

        let Some(socket) = inner.socket.as_mut() else {
            return Err(ClientError::Socket(io::Error::new(
                io::ErrorKind::NotConnected,
                "client is not initialized",
            )));
        };

        match with_deadline(WRITE_TIMEOUT, "GGA write timed out", socket.write_all(sentence)).await
        {
            Ok(()) => {
                debug!(bytes = sentence.len(), "GGA sentence sent");
                inner.gga_anchor = Instant::now();
                inner.state = ClientState::Ready;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to send GGA sentence");
                inner.state = ClientState::Error;
                inner.detailed_error = DetailedError::SocketError;
                Err(ClientError::Socket(e))
            }
        }
    }

    /// Copy the buffered correction data into `buffer` and return its
    /// length.
    ///
    /// `buffer` must hold at least [`RECEIVE_DATA_SIZE`] bytes; anything
    /// smaller could truncate a full read and is treated as fatal to the
    /// session. On success the state returns to `Ready` and the polling
    /// loop resumes reading the socket.
    pub async fn correction_data(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = timeout(LOCK_TIMEOUT, self.inner.lock())
            .await
            .map_err(|_| ClientError::Busy)?;

        if buffer.len() < RECEIVE_DATA_SIZE {
            error!(
                capacity = buffer.len(),
                required = RECEIVE_DATA_SIZE,
                "caller buffer cannot hold a full correction read"
            );
            inner.state = ClientState::Error;
            inner.detailed_error = DetailedError::BufferTooSmall;
            return Err(ClientError::BufferTooSmall {
                capacity: buffer.len(),
                required: RECEIVE_DATA_SIZE,
            });
        }

        let len = inner.recv_len;
        buffer[..len].copy_from_slice(&inner.recv_buf[..len]);
        inner.recv_len = 0;
        inner.state = ClientState::Ready;
        Ok(len)
    }

    /// Read-only snapshot of the session state; `Busy` when the lock is
    /// contended for more than a second.
    pub async fn state(&self) -> ClientState {
        match timeout(SNAPSHOT_LOCK_TIMEOUT, self.inner.lock()).await {
            Ok(inner) => inner.state,
            Err(_) => ClientState::Busy,
        }
    }

    /// Read-only snapshot of the last detailed error.
    pub async fn detailed_error(&self) -> DetailedError {
        match timeout(SNAPSHOT_LOCK_TIMEOUT, self.inner.lock()).await {
            Ok(inner) => inner.detailed_error,
            Err(_) => DetailedError::Busy,
        }
    }

    /// Whether a handshake-accepted socket is currently held. True only
    /// between a successful `init` and `deinit`/cleanup.
    pub async fn socket_valid(&self) -> bool {
        match timeout(SNAPSHOT_LOCK_TIMEOUT, self.inner.lock()).await {
            Ok(inner) => inner.socket_valid,
            Err(_) => false,
        }
    }

    /// Stop the polling task, close the socket, and clear config and
    /// credentials. Cancellation is abrupt: nothing in flight is drained,
    /// and a full reconfiguration is required before the next `init`.
    pub async fn deinit(&mut self) {
        info!("shutting down NTRIP client");
        self.stop_poll_task().await;
        self.cleanup_socket().await;
        self.config = None;
        self.credentials = None;
    }

    /// Close the socket and record the failure; used by every `init`
    /// failure path so no path can leak a socket or leave
    /// `socket_valid` set.
    async fn fail_init(
        &self,
        err: ClientError,
        socket: Option<Box<dyn CasterSocket>>,
    ) -> ClientError {
        if let Some(mut socket) = socket {
            let _ = socket.shutdown().await;
        }
        let mut inner = self.inner.lock().await;
        inner.socket = None;
        inner.socket_valid = false;
        inner.state = ClientState::Error;
        inner.detailed_error = err.detailed();
        error!(error = %err, "init failed");
        err
    }

    async fn stop_poll_task(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(task) = self.poll_task.take() {
            let _ = task.await;
        }
    }

    async fn cleanup_socket(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(mut socket) = inner.socket.take() {
            let _ = socket.shutdown().await;
        }
        inner.socket_valid = false;
        inner.recv_len = 0;
    }
}

impl Drop for NtripClient {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

/// Run `fut` under `duration`, folding the elapsed case into an I/O error.
async fn with_deadline<T, F>(duration: Duration, what: &'static str, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, what)),
    }
}

/// Background polling task: one tick per `POLL_TICK`, each under the
/// bounded-wait lock. A contended tick is skipped entirely; externally the
/// instant reads as `Busy`.
async fn poll_loop(inner: Arc<Mutex<ClientInner>>, mut shutdown_rx: Receiver<()>) {
    let mut ticker = interval(POLL_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("polling task shutting down");
                break;
            }
            _ = ticker.tick() => {
                match timeout(LOCK_TIMEOUT, inner.lock()).await {
                    Ok(mut guard) => poll_tick(&mut guard),
                    Err(_) => debug!("tick skipped, client lock contended"),
                }
            }
        }
    }
}

/// One state-machine evaluation under the lock.
fn poll_tick(inner: &mut ClientInner) {
    match inner.state {
        ClientState::Ready => {
            inner.detailed_error = DetailedError::NoError;

            if inner.gga_necessary && inner.gga_anchor.elapsed() >= GGA_INTERVAL {
                debug!("requesting GGA feedback");
                inner.state = ClientState::RequestGga;
                inner.timeout_anchor = Instant::now();
                return;
            }

            let Some(socket) = inner.socket.as_mut() else {
                return;
            };
            match socket.try_read(&mut inner.recv_buf[..]) {
                Ok(0) => {
                    warn!("caster closed the connection");
                    inner.state = ClientState::ConnectionReset;
                    inner.detailed_error = DetailedError::ConnectionReset;
                }
                Ok(n) => {
                    debug!(bytes = n, "correction data received");
                    inner.recv_len = n;
                    inner.state = ClientState::CorrectionDataAvailable;
                    inner.timeout_anchor = Instant::now();
                }
                Err(e) => match SocketErrorKind::classify(&e) {
                    SocketErrorKind::WouldBlock => {}
                    SocketErrorKind::ConnectionReset => {
                        warn!("connection reset by caster");
                        inner.state = ClientState::ConnectionReset;
                        inner.detailed_error = DetailedError::ConnectionReset;
                    }
                    _ => {
                        error!(error = %e, "socket read failed");
                        inner.state = ClientState::Error;
                        inner.detailed_error = DetailedError::SocketError;
                    }
                },
            }
        }
        ClientState::RequestGga => {
            if inner.timeout_anchor.elapsed() >= FSM_TIMEOUT {
                error!("no GGA sentence was supplied within the timeout");
                inner.state = ClientState::Error;
                inner.detailed_error = DetailedError::NoGgaTimeout;
            }
        }
        ClientState::CorrectionDataAvailable => {
            if inner.timeout_anchor.elapsed() >= FSM_TIMEOUT {
                error!("correction data was not read within the timeout");
                inner.state = ClientState::Error;
                inner.detailed_error = DetailedError::CorrectionDataTimeout;
            }
        }
        // Terminal; the caller must deinit and re-run init.
        ClientState::ConnectionReset | ClientState::Error => {}
        // Busy is transient and never stored.
        ClientState::Busy => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = NtripClient::new();
        assert!(client.config().is_none());
        assert!(client.credentials().is_none());
    }

    #[test]
    fn test_tick_is_shorter_than_every_timer() {
        assert!(POLL_TICK < GGA_INTERVAL);
        assert!(POLL_TICK < FSM_TIMEOUT);
        assert!(LOCK_TIMEOUT < SNAPSHOT_LOCK_TIMEOUT);
    }
}
