//! Session configuration and client state types.

use serde::{Deserialize, Serialize};

/// Connection parameters for one caster session.
///
/// A config is set once per session; setting it again before `init` is
/// allowed and overwrites the previous value wholesale. Nothing beyond the
/// types is validated here; a bad host or mountpoint only surfaces at
/// handshake time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasterConfig {
    /// Caster hostname or IP address
    pub host: String,
    /// Caster TCP port (commonly 2101)
    pub port: u16,
    /// Mountpoint naming the correction stream
    pub mountpoint: String,
    /// Whether the caster expects periodic GGA position feedback
    pub gga_necessary: bool,
}

impl CasterConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        mountpoint: impl Into<String>,
        gga_necessary: bool,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            mountpoint: mountpoint.into(),
            gga_necessary,
        }
    }
}

/// Credentials presented during the caster handshake.
///
/// `user_agent` is always required; `username`/`password` are only
/// meaningful when `use_auth` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Send an `Authorization: Basic` header during the handshake
    pub use_auth: bool,
    pub username: String,
    pub password: String,
    /// Value of the `User-Agent` header
    pub user_agent: String,
}

impl Credentials {
    /// Credentials with HTTP Basic authentication.
    pub fn basic(
        username: impl Into<String>,
        password: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            use_auth: true,
            username: username.into(),
            password: password.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Credentials for casters that accept anonymous access.
    pub fn anonymous(user_agent: impl Into<String>) -> Self {
        Self {
            use_auth: false,
            username: String::new(),
            password: String::new(),
            user_agent: user_agent.into(),
        }
    }
}

/// State of an NTRIP client session.
///
/// `ConnectionReset` and `Error` are terminal for the instance: the caller
/// must `deinit` and run the full `init` sequence again. `Busy` is never
/// persisted; it is only ever observed when the client lock could not be
/// acquired within its bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientState {
    /// Connected and idle; the polling loop reads the socket in this state
    Ready,
    /// The caster expects a GGA sentence via `send_gga`
    RequestGga,
    /// A correction buffer is waiting to be drained via `correction_data`
    CorrectionDataAvailable,
    /// The caster closed or reset the connection
    ConnectionReset,
    /// A persistent failure occurred; see the detailed error
    Error,
    /// The client lock was contended; retry the call
    Busy,
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientState::Ready => write!(f, "Ready"),
            ClientState::RequestGga => write!(f, "RequestGga"),
            ClientState::CorrectionDataAvailable => write!(f, "CorrectionDataAvailable"),
            ClientState::ConnectionReset => write!(f, "ConnectionReset"),
            ClientState::Error => write!(f, "Error"),
            ClientState::Busy => write!(f, "Busy"),
        }
    }
}

/// Fine-grained cause code supplementing the coarse state.
///
/// Persisted alongside `ClientState` and cleared back to `NoError` on every
/// `Ready` tick. `Busy` is returned to callers on lock contention but never
/// stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailedError {
    #[default]
    NoError,
    Unknown,
    Busy,
    ConnectionReset,
    /// The caller's buffer is smaller than the correction buffer capacity
    BufferTooSmall,
    /// No `send_gga` call arrived within the state-machine timeout
    NoGgaTimeout,
    /// No `correction_data` call arrived within the state-machine timeout
    CorrectionDataTimeout,
    SocketError,
    UnableToCreateTask,
    SemaphoreError,
    /// The caster answered the handshake with a source table
    InvalidMountpoint,
}

impl std::fmt::Display for DetailedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetailedError::NoError => write!(f, "no error"),
            DetailedError::Unknown => write!(f, "unknown error"),
            DetailedError::Busy => write!(f, "client busy"),
            DetailedError::ConnectionReset => write!(f, "connection reset"),
            DetailedError::BufferTooSmall => write!(f, "caller buffer too small"),
            DetailedError::NoGgaTimeout => write!(f, "timed out waiting for GGA"),
            DetailedError::CorrectionDataTimeout => {
                write!(f, "timed out waiting for correction data to be read")
            }
            DetailedError::SocketError => write!(f, "socket error"),
            DetailedError::UnableToCreateTask => write!(f, "unable to spawn polling task"),
            DetailedError::SemaphoreError => write!(f, "lock failure"),
            DetailedError::InvalidMountpoint => write!(f, "mountpoint rejected by caster"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_constructor() {
        let config = CasterConfig::new("caster.example.net", 2101, "MOUNT01", true);
        assert_eq!(config.host, "caster.example.net");
        assert_eq!(config.port, 2101);
        assert_eq!(config.mountpoint, "MOUNT01");
        assert!(config.gga_necessary);
    }

    #[test]
    fn test_credentials_constructors() {
        let creds = Credentials::basic("rover", "secret", "NTRIP roverlink/0.2");
        assert!(creds.use_auth);
        assert_eq!(creds.username, "rover");

        let anon = Credentials::anonymous("NTRIP roverlink/0.2");
        assert!(!anon.use_auth);
        assert!(anon.username.is_empty());
        assert_eq!(anon.user_agent, "NTRIP roverlink/0.2");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ClientState::Ready.to_string(), "Ready");
        assert_eq!(
            ClientState::CorrectionDataAvailable.to_string(),
            "CorrectionDataAvailable"
        );
    }

    #[test]
    fn test_detailed_error_default() {
        assert_eq!(DetailedError::default(), DetailedError::NoError);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&ClientState::RequestGga).unwrap();
        assert_eq!(json, "\"RequestGga\"");

        let back: DetailedError = serde_json::from_str("\"NoGgaTimeout\"").unwrap();
        assert_eq!(back, DetailedError::NoGgaTimeout);
    }
}
