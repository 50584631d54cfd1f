//! Error types for key management and the seal/unseal engine.
//!
//! Messages are intentionally vague. In particular [`SealError::CryptoFailure`]
//! never says *which* primitive failed, so a padding error, a wrong key and a
//! corrupted ciphertext are indistinguishable to the caller.

use common::ServiceError;
use thiserror::Error;

/// Failures surfaced by [`crate::engine::Sealer`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SealError {
    /// Any wrap/unwrap/encrypt/decrypt failure.
    #[error("cryptographic operation failed")]
    CryptoFailure,

    /// The transport string could not be decoded into an envelope.
    #[error("malformed envelope")]
    MalformedEnvelope,

    /// The envelope is bound to a different principal.
    #[error("envelope principal mismatch")]
    PrincipalMismatch,

    /// The envelope falls outside the replay window.
    #[error("envelope expired")]
    EnvelopeExpired,

    /// The envelope was already unsealed and single-use enforcement is on.
    #[error("envelope already consumed")]
    EnvelopeReplayed,
}

/// Failures raised while establishing the service key pair.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Configured key material is present but unusable.
    ///
    /// Absorbed by [`crate::keys::KeyManager::initialize`], which falls back to
    /// generating a fresh pair.
    #[error("configured key material is invalid: {0}")]
    KeyMaterialInvalid(&'static str),

    /// Key pair generation itself failed.
    #[error("key pair generation failed")]
    Generation(#[source] rsa::Error),

    /// Encoding the key pair to PEM failed.
    #[error("key export failed")]
    Export,
}

impl From<SealError> for ServiceError {
    fn from(err: SealError) -> Self {
        match err {
            SealError::MalformedEnvelope
            | SealError::PrincipalMismatch
            | SealError::EnvelopeExpired
            | SealError::EnvelopeReplayed => ServiceError::Rejected,
            // Callers of unseal remap this to Rejected themselves; reaching
            // here means sealing failed.
            SealError::CryptoFailure => ServiceError::EncryptionFailure,
        }
    }
}
