//! HTTP Basic authentication for the caster handshake.

use base64::{engine::general_purpose, Engine as _};

/// Value of the `Authorization: Basic` header for the given credentials.
pub fn basic_auth_value(username: &str, password: &str) -> String {
    general_purpose::STANDARD.encode(format!("{username}:{password}"))
}
