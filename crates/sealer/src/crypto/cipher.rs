//! AES-256-GCM-SIV encryption of payload bytes under a one-time session key.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is authenticated and
//! nonce-misuse-resistant. Every envelope gets its own key *and* its own
//! random nonce, so neither is ever reused; the SIV construction still keeps
//! a buggy RNG from degrading into the catastrophic GCM nonce-reuse case.
//!
//! The associated data carries the envelope header, so the tag also covers
//! the principal, timestamp and key identifier.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes256GcmSiv, Nonce,
};
use thiserror::Error;
use zeroize::Zeroize;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Key material is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid session key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// AES-GCM-SIV encryption or decryption failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// One-time symmetric key used for exactly one envelope.
///
/// Not `Clone`: a session key is created, used once, and
/// dropped. On drop the buffer is overwritten with zeroes.
pub struct SessionKey(Box<[u8; KEY_LEN]>);

impl SessionKey {
    /// Draw a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut buf = Box::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut buf[..]);
        Self(buf)
    }

    /// Adopt key bytes recovered from a wrapped key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] if `bytes` is not [`KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKeyLength);
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Borrow the raw key bytes, e.g. to wrap them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.0[..].zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Generate a random 96-bit nonce via the OS CSPRNG.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
///
/// The returned buffer is the ciphertext with the [`TAG_LEN`]-byte tag appended.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (unreachable
/// with a valid key and nonce).
pub fn encrypt(
    key: &SessionKey,
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CipherError::AeadFailure)
}

/// Decrypt and authenticate `ciphertext` produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key,
/// wrong associated data, or tampered bytes). No plaintext is released on
/// failure.
pub fn decrypt(
    key: &SessionKey,
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CipherError::AeadFailure)
}

fn build_cipher(key: &SessionKey) -> Result<Aes256GcmSiv, CipherError> {
    Aes256GcmSiv::new_from_slice(key.as_bytes()).map_err(|_| CipherError::InvalidKeyLength)
}
