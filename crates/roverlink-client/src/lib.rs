//! # roverlink-client
//!
//! NTRIP correction-data client for GNSS rovers.
//!
//! The client connects to an NTRIP caster over plain TCP, performs the
//! HTTP/1.0-flavored handshake for a mountpoint, and then runs a single
//! background polling task that surfaces correction data and GGA position
//! requests through a small state machine:
//!
//! - All shared state sits behind one lock that is only ever acquired with
//!   a bounded wait; contention surfaces as a transient `Busy`, never as a
//!   stall.
//! - Two liveness timers guard the session: a pending GGA request and an
//!   unread correction buffer each expire after 30 seconds.
//! - `Error` and `ConnectionReset` are terminal; the caller observes them,
//!   calls `deinit`, and runs the full `init` sequence again.
//!
//! ## Example
//!
//! ```rust,no_run
//! use roverlink_client::{
//!     CasterConfig, ClientState, Credentials, NtripClient, RECEIVE_DATA_SIZE,
//! };
//!
//! #[tokio::main]
//! async fn main() -> roverlink_client::Result<()> {
//!     let mut client = NtripClient::new();
//!     client.set_config(CasterConfig::new("caster.example.net", 2101, "MOUNT01", true));
//!     client.set_credentials(Credentials::basic("rover", "secret", "NTRIP roverlink/0.2"));
//!     client.init().await?;
//!
//!     let mut buf = vec![0u8; RECEIVE_DATA_SIZE];
//!     loop {
//!         match client.state().await {
//!             ClientState::RequestGga => {
//!                 client.send_gga(b"$GPGGA,133730,5231.10,N,01324.26,E,1,08,0.9,40.0,M,,M,,*47\r\n").await?;
//!             }
//!             ClientState::CorrectionDataAvailable => {
//!                 let n = client.correction_data(&mut buf).await?;
//!                 // feed buf[..n] to the GNSS receiver
//!                 let _ = n;
//!             }
//!             _ => tokio::time::sleep(std::time::Duration::from_millis(50)).await,
//!         }
//!     }
//! }
//! ```

pub mod auth;
pub mod client;
pub mod handshake;
pub mod socket;

// Re-export commonly used types
pub use client::{NtripClient, RECEIVE_DATA_SIZE};
pub use socket::{CasterSocket, SocketErrorKind, SocketProvider, TcpSocketProvider};

// Re-export the core types so callers only need one crate
pub use roverlink_core::{
    CasterConfig, ClientError, ClientState, Credentials, DetailedError, Result,
};
