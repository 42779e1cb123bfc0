//! The socket provider seam between the client and the transport.
//!
//! The client never touches `tokio::net` directly; everything flows through
//! the [`CasterSocket`] and [`SocketProvider`] traits so the transport can
//! be swapped out (tests script one, an embedded port would wrap its
//! network stack here). Transport failures are classified into
//! [`SocketErrorKind`] rather than compared against raw error numbers.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::info;

/// Timeout for resolving and connecting to the caster
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP keepalive probe interval on the caster connection
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Named classification of transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketErrorKind {
    /// No data queued on a non-blocking read; not a failure
    WouldBlock,
    /// The peer reset or abandoned the connection
    ConnectionReset,
    /// The caster host could not be reached
    HostUnreachable,
    /// Anything else
    Other,
}

impl SocketErrorKind {
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => SocketErrorKind::WouldBlock,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => SocketErrorKind::ConnectionReset,
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                SocketErrorKind::HostUnreachable
            }
            _ => SocketErrorKind::Other,
        }
    }
}

/// A connected caster socket.
///
/// `try_read` must never block: the polling loop calls it on every tick and
/// relies on `WouldBlock` to mean "no correction data right now".
#[async_trait]
pub trait CasterSocket: Send {
    /// Non-blocking read of whatever is queued on the socket.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Blocking read, used once for the handshake response.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    async fn shutdown(&mut self) -> io::Result<()>;
}

#[async_trait]
impl CasterSocket for TcpStream {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        AsyncReadExt::read(self, buf).await
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(self, buf).await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        AsyncWriteExt::shutdown(self).await
    }
}

/// Resolves a caster host and opens a connection to it.
#[async_trait]
pub trait SocketProvider: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> io::Result<Box<dyn CasterSocket>>;
}

/// Default provider over the operating system's TCP stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpSocketProvider;

#[async_trait]
impl SocketProvider for TcpSocketProvider {
    async fn connect(&self, host: &str, port: u16) -> io::Result<Box<dyn CasterSocket>> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;

        configure_socket(&stream)?;

        info!(host, port, "connected to caster");
        Ok(Box::new(stream))
    }
}

/// Configure TCP socket options on the caster connection.
fn configure_socket(stream: &TcpStream) -> io::Result<()> {
    stream.set_nodelay(true)?;

    let keepalive = socket2::TcpKeepalive::new().with_time(KEEPALIVE_INTERVAL);
    let socket = socket2::SockRef::from(stream);
    socket.set_tcp_keepalive(&keepalive)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_would_block() {
        let err = io::Error::new(io::ErrorKind::WouldBlock, "no data");
        assert_eq!(SocketErrorKind::classify(&err), SocketErrorKind::WouldBlock);
    }

    #[test]
    fn test_classify_reset_family() {
        for kind in [
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
        ] {
            let err = io::Error::new(kind, "reset");
            assert_eq!(
                SocketErrorKind::classify(&err),
                SocketErrorKind::ConnectionReset
            );
        }
    }

    #[test]
    fn test_classify_unreachable_and_other() {
        let err = io::Error::new(io::ErrorKind::HostUnreachable, "unreachable");
        assert_eq!(
            SocketErrorKind::classify(&err),
            SocketErrorKind::HostUnreachable
        );

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(SocketErrorKind::classify(&err), SocketErrorKind::Other);
    }
}
