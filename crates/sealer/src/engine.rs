//! Seal/unseal engine.
//!
//! [`Sealer::seal`] draws a one-time AES-256 session key and nonce, encrypts
//! the payload with the envelope header as associated data, wraps the session
//! key under the service RSA key and encodes the result. [`Sealer::unseal`]
//! reverses this after the structural, principal and replay-window checks.
//!
//! Both operations are synchronous and CPU-bound. The only shared state is the
//! immutable [`KeyManager`] (plus the consumed-set when single-use mode is on),
//! so a `Sealer` can be cloned freely and used from any thread.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::crypto::{cipher, SessionKey};
use crate::envelope::{self, associated_data, Envelope, KeyIdentifier, PrincipalId};
use crate::error::SealError;
use crate::keys::KeyManager;
use crate::replay::ConsumedSet;

/// Source of the current time.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Replay-window policy applied on unseal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealPolicy {
    /// Oldest acceptable envelope age.
    pub max_age: Duration,
    /// Tolerance for envelopes stamped slightly in the future.
    pub clock_skew: Duration,
    /// Refuse a second unseal of the same envelope.
    pub single_use: bool,
}

impl Default for SealPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(24),
            clock_skew: Duration::minutes(5),
            single_use: false,
        }
    }
}

/// Seals and unseals payloads with the service key pair.
#[derive(Clone)]
pub struct Sealer {
    keys: Arc<KeyManager>,
    policy: SealPolicy,
    clock: Arc<dyn Clock>,
    consumed: Option<Arc<ConsumedSet>>,
}

impl Sealer {
    /// Build an engine over `keys` using wall-clock time.
    pub fn new(keys: Arc<KeyManager>, policy: SealPolicy) -> Self {
        Self::with_clock(keys, policy, Arc::new(SystemClock))
    }

    /// Build an engine with an explicit time source.
    pub fn with_clock(keys: Arc<KeyManager>, policy: SealPolicy, clock: Arc<dyn Clock>) -> Self {
        let retention = policy
            .max_age
            .checked_add(&policy.clock_skew)
            .unwrap_or(policy.max_age);
        let consumed = policy
            .single_use
            .then(|| Arc::new(ConsumedSet::new(retention)));
        Self {
            keys,
            policy,
            clock,
            consumed,
        }
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    pub fn policy(&self) -> SealPolicy {
        self.policy
    }

    /// Seal `payload` for `principal_id` and return the transport string.
    ///
    /// Every call uses a fresh session key, nonce and key identifier, so equal
    /// inputs never produce equal outputs.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::CryptoFailure`] if encryption or key wrapping fails.
    /// Nothing derived from the payload is returned in that case.
    pub fn seal(&self, payload: &[u8], principal_id: PrincipalId) -> Result<String, SealError> {
        self.seal_envelope(payload, principal_id)
            .map(|envelope| envelope::encode(&envelope))
    }

    /// Like [`Self::seal`] but returns the structured envelope.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::CryptoFailure`] if encryption or key wrapping fails.
    pub fn seal_envelope(
        &self,
        payload: &[u8],
        principal_id: PrincipalId,
    ) -> Result<Envelope, SealError> {
        let session_key = SessionKey::generate();
        let iv = cipher::generate_nonce();
        let key_id = KeyIdentifier::generate();
        let sealed_at = whole_seconds(self.clock.now());

        let aad = associated_data(principal_id, sealed_at, &key_id);
        let ciphertext = cipher::encrypt(&session_key, &iv, payload, &aad)
            .map_err(|_| SealError::CryptoFailure)?;
        let wrapped_key = self.keys.wrap(session_key.as_bytes())?;

        debug!(key_id = %key_id, principal_id = %principal_id, "payload sealed");
        Ok(Envelope {
            ciphertext,
            wrapped_key,
            iv,
            principal_id,
            sealed_at,
            key_id,
        })
    }

    /// Recover the payload from `transport` on behalf of `expected_principal`.
    ///
    /// Checks run in a fixed order: structure, principal binding, replay
    /// window, then cryptography. Apart from the optional consumed-set this
    /// has no side effects.
    ///
    /// # Errors
    ///
    /// - [`SealError::MalformedEnvelope`] if `transport` does not decode.
    /// - [`SealError::PrincipalMismatch`] if the envelope is bound elsewhere.
    /// - [`SealError::EnvelopeExpired`] if it is outside the replay window.
    /// - [`SealError::CryptoFailure`] if unwrapping or decryption fails.
    /// - [`SealError::EnvelopeReplayed`] if single-use mode has seen it before.
    pub fn unseal(
        &self,
        transport: &str,
        expected_principal: PrincipalId,
    ) -> Result<Vec<u8>, SealError> {
        let envelope = envelope::decode(transport)?;
        self.unseal_envelope(&envelope, expected_principal)
    }

    /// Like [`Self::unseal`] for an already decoded envelope.
    ///
    /// # Errors
    ///
    /// As [`Self::unseal`], minus [`SealError::MalformedEnvelope`].
    pub fn unseal_envelope(
        &self,
        envelope: &Envelope,
        expected_principal: PrincipalId,
    ) -> Result<Vec<u8>, SealError> {
        if envelope.principal_id != expected_principal {
            return Err(SealError::PrincipalMismatch);
        }

        let now = self.clock.now();
        self.check_window(envelope.sealed_at, now)?;

        let key_bytes = self.keys.unwrap(&envelope.wrapped_key)?;
        let session_key =
            SessionKey::from_slice(&key_bytes).map_err(|_| SealError::CryptoFailure)?;
        let payload = cipher::decrypt(
            &session_key,
            &envelope.iv,
            &envelope.ciphertext,
            &envelope.associated_data(),
        )
        .map_err(|_| SealError::CryptoFailure)?;

        if let Some(consumed) = &self.consumed {
            if !consumed.try_consume(&envelope.key_id, envelope.sealed_at, now) {
                return Err(SealError::EnvelopeReplayed);
            }
        }

        debug!(key_id = %envelope.key_id, principal_id = %expected_principal, "payload unsealed");
        Ok(payload)
    }

    fn check_window(&self, sealed_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), SealError> {
        let age = now.signed_duration_since(sealed_at);
        if age > self.policy.max_age || age < -self.policy.clock_skew {
            return Err(SealError::EnvelopeExpired);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Sealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sealer")
            .field("keys", &self.keys)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn whole_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}
