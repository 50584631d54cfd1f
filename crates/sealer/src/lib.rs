//! Hybrid RSA-OAEP / AES-256-GCM-SIV envelope sealing.
//!
//! A payload is sealed under a one-time AES session key, the session key is
//! wrapped under the service RSA key, and the result is bound to a principal
//! and a creation time. See [`engine::Sealer`] for the entry points.

pub mod config;
pub mod crypto;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod ident;
pub mod keys;
pub mod replay;
pub mod server;
pub mod telemetry;

#[cfg(test)]
mod testutil;

pub use engine::{SealPolicy, Sealer};
pub use envelope::{Envelope, KeyIdentifier, PrincipalId};
pub use error::{KeyError, SealError};
pub use keys::KeyManager;
