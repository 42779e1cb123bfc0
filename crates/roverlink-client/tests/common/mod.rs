//! Shared test support: a scripted socket provider standing in for a caster.

use async_trait::async_trait;
use roverlink_client::socket::{CasterSocket, SocketProvider};
use roverlink_client::NtripClient;
use roverlink_core::types::{CasterConfig, Credentials};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted outcome for a socket read.
enum ReadStep {
    Data(Vec<u8>),
    Closed,
    Error(io::ErrorKind),
}

#[derive(Default)]
struct Shared {
    reads: VecDeque<ReadStep>,
    written: Vec<u8>,
    shut_down: bool,
}

/// Handle the test keeps to feed reads and inspect writes after the socket
/// has been moved into the client.
#[derive(Clone, Default)]
pub struct MockCaster {
    shared: Arc<Mutex<Shared>>,
}

impl MockCaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the next read (handshake response or corrections).
    pub fn push_data(&self, bytes: &[u8]) {
        self.shared
            .lock()
            .unwrap()
            .reads
            .push_back(ReadStep::Data(bytes.to_vec()));
    }

    /// Queue an orderly close (a zero-length read).
    pub fn push_closed(&self) {
        self.shared.lock().unwrap().reads.push_back(ReadStep::Closed);
    }

    /// Queue a read error of the given kind.
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.shared
            .lock()
            .unwrap()
            .reads
            .push_back(ReadStep::Error(kind));
    }

    /// Everything the client has written so far.
    pub fn written(&self) -> Vec<u8> {
        self.shared.lock().unwrap().written.clone()
    }

    pub fn was_shut_down(&self) -> bool {
        self.shared.lock().unwrap().shut_down
    }
}

struct MockSocket {
    shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl CasterSocket for MockSocket {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut shared = self.shared.lock().unwrap();
        match shared.reads.pop_front() {
            Some(ReadStep::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(ReadStep::Closed) => Ok(0),
            Some(ReadStep::Error(kind)) => Err(io::Error::new(kind, "scripted read error")),
            None => Err(io::Error::new(io::ErrorKind::WouldBlock, "no data queued")),
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // The handshake reads once; an unscripted read behaves like a
        // caster that sent nothing.
        match self.try_read(buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            other => other,
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.shared.lock().unwrap().written.extend_from_slice(buf);
        Ok(())
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.shared.lock().unwrap().shut_down = true;
        Ok(())
    }
}

/// Provider handing out sockets wired to a [`MockCaster`] script.
pub struct MockProvider {
    caster: MockCaster,
    fail_connect: Option<io::ErrorKind>,
}

impl MockProvider {
    pub fn new(caster: &MockCaster) -> Arc<Self> {
        Arc::new(Self {
            caster: caster.clone(),
            fail_connect: None,
        })
    }

    /// A provider whose connect always fails with the given kind.
    pub fn failing(kind: io::ErrorKind) -> Arc<Self> {
        Arc::new(Self {
            caster: MockCaster::new(),
            fail_connect: Some(kind),
        })
    }
}

#[async_trait]
impl SocketProvider for MockProvider {
    async fn connect(&self, _host: &str, _port: u16) -> io::Result<Box<dyn CasterSocket>> {
        if let Some(kind) = self.fail_connect {
            return Err(io::Error::new(kind, "scripted connect failure"));
        }
        Ok(Box::new(MockSocket {
            shared: Arc::clone(&self.caster.shared),
        }))
    }
}

/// A client configured against the mock caster.
pub fn configured_client(provider: Arc<MockProvider>, gga_necessary: bool) -> NtripClient {
    let mut client = NtripClient::with_provider(provider);
    client.set_config(CasterConfig::new("caster.test", 2101, "MOUNT01", gga_necessary));
    client.set_credentials(Credentials::basic("rover", "secret", "NTRIP roverlink-test/0.2"));
    client
}

/// Let the polling loop run a few ticks of (virtual) time.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
