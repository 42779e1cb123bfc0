//! # roverlink-core
//!
//! Core types and error handling for the roverlink NTRIP client.
//!
//! This crate provides the foundational building blocks shared between the
//! client crate and binaries:
//!
//! - **Types**: `CasterConfig` and `Credentials` describing a caster
//!   session, plus the `ClientState` machine states and the fine-grained
//!   `DetailedError` cause codes.
//! - **Errors**: `ClientError` via `thiserror` for all failure modes, with
//!   a mapping onto the persisted `DetailedError` taxonomy.
//!
//! ## Example
//!
//! ```
//! use roverlink_core::types::{CasterConfig, Credentials};
//!
//! let config = CasterConfig::new("caster.example.net", 2101, "MOUNT01", true);
//! let creds = Credentials::basic("rover", "secret", "NTRIP roverlink/0.2");
//!
//! assert!(config.gga_necessary);
//! assert!(creds.use_auth);
//! ```

pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{ClientError, Result};
pub use types::{CasterConfig, ClientState, Credentials, DetailedError};
