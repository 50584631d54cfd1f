//! Service key pair lifecycle.
//!
//! # Lifecycle
//!
//! 1. At startup, [`configured_material`] collects the optional public/private
//!    PEM values from configuration (inline values win over file paths).
//! 2. [`KeyManager::initialize`] imports them, or generates a fresh pair if
//!    either half is missing or unusable.
//! 3. The resulting [`KeyManager`] is wrapped in an `Arc` and handed to the
//!    engine. It is never replaced or mutated for the life of the process.
//!
//! # Security invariants
//!
//! - The private key is **never** logged, traced, or written anywhere by this
//!   crate. A generated pair is lost on restart unless a caller explicitly
//!   exports and stores it.

pub mod manager;

pub use manager::{KeyManager, KeyOrigin, MIN_KEY_BITS};

use tracing::warn;

use crate::config::Config;

/// Public and private PEM text, either of which may be absent.
#[derive(Default)]
pub struct KeyMaterial {
    pub public_pem: Option<String>,
    pub private_pem: Option<String>,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public_pem", &self.public_pem.is_some())
            .field("private_pem", &self.private_pem.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Resolve the key material named by `cfg`.
///
/// An unreadable file is logged and treated as absent, which lets
/// [`KeyManager::initialize`] fall back to generation.
pub fn configured_material(cfg: &Config) -> KeyMaterial {
    KeyMaterial {
        public_pem: resolve_pem(
            cfg.public_key_pem.as_deref(),
            cfg.public_key_path.as_deref(),
            "public",
        ),
        private_pem: resolve_pem(
            cfg.private_key_pem.as_deref(),
            cfg.private_key_path.as_deref(),
            "private",
        ),
    }
}

fn resolve_pem(inline: Option<&str>, path: Option<&str>, half: &'static str) -> Option<String> {
    if let Some(pem) = inline.filter(|s| !s.trim().is_empty()) {
        return Some(pem.to_owned());
    }
    let path = path.filter(|p| !p.trim().is_empty())?;
    match std::fs::read_to_string(path) {
        Ok(pem) => Some(pem),
        Err(e) => {
            warn!(half, path, error = %e, "failed to read key file; ignoring it");
            None
        }
    }
}
