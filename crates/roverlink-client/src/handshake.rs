//! Caster handshake: request formatting and first-response classification.
//!
//! NTRIP bootstraps with a single HTTP/1.0-flavored GET. The caster answers
//! with `ICY 200 OK` and starts the raw correction stream, or with
//! `SOURCETABLE 200 OK` followed by its source table when the mountpoint is
//! not served. Only the first response line matters here; the source table
//! body is never parsed.

use crate::auth;
use roverlink_core::types::{CasterConfig, Credentials};

/// Marker in the caster's response when the mountpoint is accepted
pub const ICY_ACCEPT: &str = "ICY 200 OK\r\n";

/// Marker in the caster's response when it answers with a source table
pub const SOURCETABLE_REJECT: &str = "SOURCETABLE 200 OK\r\n";

/// Capacity of the buffer for the caster's first response
pub const RESPONSE_BUFFER_SIZE: usize = 64;

/// Classification of the caster's first response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeResponse {
    /// The caster accepted the mountpoint and will stream corrections
    Accepted,
    /// The caster rejected the mountpoint and sent its source table
    SourceTable,
    /// Neither marker was present
    Unrecognized,
}

/// Format the handshake request for the configured mountpoint.
///
/// The `Authorization` line is present only when the credentials carry
/// `use_auth`.
pub fn build_request(config: &CasterConfig, credentials: &Credentials) -> String {
    let mut request = format!(
        "GET /{} HTTP/1.0\r\nUser-Agent: {}\r\nAccept: */*\r\n",
        config.mountpoint, credentials.user_agent
    );
    if credentials.use_auth {
        request.push_str(&format!(
            "Authorization: Basic {}\r\n",
            auth::basic_auth_value(&credentials.username, &credentials.password)
        ));
    }
    request.push_str("Connection: close\r\n\r\n");
    request
}

/// Classify the first bytes the caster sent back.
pub fn classify_response(raw: &[u8]) -> HandshakeResponse {
    let text = String::from_utf8_lossy(raw);
    if text.contains(ICY_ACCEPT) {
        HandshakeResponse::Accepted
    } else if text.contains(SOURCETABLE_REJECT) {
        HandshakeResponse::SourceTable
    } else {
        HandshakeResponse::Unrecognized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CasterConfig {
        CasterConfig::new("caster.example.net", 2101, "MOUNT01", true)
    }

    #[test]
    fn test_request_with_auth() {
        let request = build_request(&config(), &Credentials::basic("rover", "secret", "NTRIP roverlink/0.2"));

        assert!(request.starts_with("GET /MOUNT01 HTTP/1.0\r\n"));
        assert!(request.contains("User-Agent: NTRIP roverlink/0.2\r\n"));
        assert!(request.contains("Accept: */*\r\n"));
        assert!(request.contains("Authorization: Basic cm92ZXI6c2VjcmV0\r\n"));
        assert!(request.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn test_request_without_auth() {
        let request = build_request(&config(), &Credentials::anonymous("NTRIP roverlink/0.2"));

        assert!(!request.contains("Authorization"));
        assert!(request.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn test_classify_accepted() {
        assert_eq!(
            classify_response(b"ICY 200 OK\r\n"),
            HandshakeResponse::Accepted
        );
    }

    #[test]
    fn test_classify_sourcetable() {
        assert_eq!(
            classify_response(b"SOURCETABLE 200 OK\r\nServer: caster\r\n"),
            HandshakeResponse::SourceTable
        );
    }

    #[test]
    fn test_classify_unrecognized() {
        assert_eq!(
            classify_response(b"HTTP/1.0 401 Unauthorized\r\n"),
            HandshakeResponse::Unrecognized
        );
        // A bare status line without CRLF is not enough
        assert_eq!(
            classify_response(b"ICY 200 OK"),
            HandshakeResponse::Unrecognized
        );
        assert_eq!(classify_response(b""), HandshakeResponse::Unrecognized);
    }
}
