//! Shared application state injected into every Axum handler.

use crate::engine::Sealer;

/// Application state shared across all request handlers.
///
/// [`Sealer`] is `Arc`-backed, so Axum can clone the state per request
/// without copying key material.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Seal/unseal engine over the service key pair.
    pub sealer: Sealer,
}

impl AppState {
    /// Create a new [`AppState`] around `sealer`.
    pub fn new(sealer: Sealer) -> Self {
        Self { sealer }
    }
}
