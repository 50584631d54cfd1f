//! [`KeyManager`]: the service's long-lived RSA key pair and the OAEP
//! wrap/unwrap primitives over it.
//!
//! # Residual timing risk
//!
//! The `rsa` crate's private-key operation is not constant time
//! (RUSTSEC-2023-0071, the "Marvin" attack). [`KeyManager::unwrap`] uses
//! blinded decryption, which is the strongest mitigation the crate offers,
//! but an unseal endpoint still acts as a decryption oracle an attacker can
//! time. Deployments should rate-limit unseal calls per caller at the routing
//! layer.

use aes_gcm_siv::aead::OsRng;
use chrono::{DateTime, Utc};
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey, LineEnding},
    traits::PublicKeyParts,
    Oaep, RsaPrivateKey, RsaPublicKey,
};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::{KeyError, SealError};

/// Smallest modulus accepted for imported or generated keys.
pub const MIN_KEY_BITS: usize = 2048;

/// Output length of the OAEP hash (SHA-256).
const OAEP_HASH_LEN: usize = 32;

/// Where the active key pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Parsed from configured PEM material.
    Imported,
    /// Freshly generated at startup.
    Generated,
}

impl KeyOrigin {
    /// Lower-case label used in logs and health output.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyOrigin::Imported => "imported",
            KeyOrigin::Generated => "generated",
        }
    }
}

/// The service's asymmetric key pair.
///
/// Built once at startup and never mutated afterwards. Every method takes
/// `&self` and the underlying RSA key types are plain immutable integers, so a
/// single `Arc<KeyManager>` can be shared by any number of concurrent
/// seal/unseal calls without locking.
pub struct KeyManager {
    private: RsaPrivateKey,
    public: RsaPublicKey,
    origin: KeyOrigin,
    created_at: DateTime<Utc>,
    fingerprint: String,
}

impl KeyManager {
    /// Establish the key pair for this service instance.
    ///
    /// When both PEM values are present, the private key parses, the public
    /// key matches it and the modulus is at least [`MIN_KEY_BITS`], the
    /// configured pair is used. Otherwise a fresh pair of `bits` bits is
    /// generated; invalid configured material is logged and absorbed.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Generation`] only if generating the fallback pair
    /// fails, which requires a broken OS RNG.
    pub fn initialize(
        public_pem: Option<&str>,
        private_pem: Option<&str>,
        bits: usize,
    ) -> Result<Self, KeyError> {
        let public_pem = public_pem.filter(|s| !s.trim().is_empty());
        let private_pem = private_pem.filter(|s| !s.trim().is_empty());

        match (public_pem, private_pem) {
            (Some(public), Some(private)) => match Self::import(public, private) {
                Ok(manager) => {
                    manager.log_ready();
                    return Ok(manager);
                }
                Err(e) => {
                    warn!(error = %e, "configured key material unusable; generating a fresh key pair")
                }
            },
            (None, None) => info!("no key material configured; generating a fresh key pair"),
            _ => warn!("only one half of the key pair is configured; generating a fresh key pair"),
        }

        let manager = Self::generate(bits)?;
        manager.log_ready();
        Ok(manager)
    }

    /// Generate a fresh key pair of at least [`MIN_KEY_BITS`] bits.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Generation`] if the RSA generator fails.
    pub fn generate(bits: usize) -> Result<Self, KeyError> {
        let bits = bits.max(MIN_KEY_BITS);
        let private = RsaPrivateKey::new(&mut OsRng, bits).map_err(KeyError::Generation)?;
        Ok(Self::from_parts(private, KeyOrigin::Generated))
    }

    /// Wrap an already-parsed private key, e.g. a fixed key injected by tests.
    pub fn from_private_key(private: RsaPrivateKey) -> Self {
        Self::from_parts(private, KeyOrigin::Imported)
    }

    fn import(public_pem: &str, private_pem: &str) -> Result<Self, KeyError> {
        let private = parse_private_pem(private_pem)?;
        let public = parse_public_pem(public_pem)?;

        if private.n().bits() < MIN_KEY_BITS {
            return Err(KeyError::KeyMaterialInvalid("modulus is smaller than 2048 bits"));
        }
        if private.validate().is_err() {
            return Err(KeyError::KeyMaterialInvalid("private key failed consistency checks"));
        }
        if private.to_public_key() != public {
            return Err(KeyError::KeyMaterialInvalid(
                "public key does not match private key",
            ));
        }

        Ok(Self::from_parts(private, KeyOrigin::Imported))
    }

    fn from_parts(private: RsaPrivateKey, origin: KeyOrigin) -> Self {
        let public = private.to_public_key();
        let fingerprint = fingerprint_of(&public);
        Self {
            private,
            public,
            origin,
            created_at: Utc::now(),
            fingerprint,
        }
    }

    fn log_ready(&self) {
        info!(
            origin = self.origin.as_str(),
            bits = self.bits(),
            fingerprint = %self.fingerprint,
            created_at = %self.created_at,
            "key pair ready"
        );
    }

    /// Encrypt session key bytes under the public key with RSA-OAEP-SHA256.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::CryptoFailure`] if `key_bytes` is longer than
    /// [`Self::max_wrap_len`] or the RSA operation fails.
    pub fn wrap(&self, key_bytes: &[u8]) -> Result<Vec<u8>, SealError> {
        if key_bytes.len() > self.max_wrap_len() {
            return Err(SealError::CryptoFailure);
        }
        self.public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key_bytes)
            .map_err(|_| SealError::CryptoFailure)
    }

    /// Recover session key bytes from a wrapped key.
    ///
    /// Decryption is blinded, and every failure (wrong length, out-of-range
    /// integer, bad OAEP padding) yields the same [`SealError::CryptoFailure`].
    ///
    /// # Errors
    ///
    /// Returns [`SealError::CryptoFailure`] on any decryption error.
    pub fn unwrap(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, SealError> {
        if wrapped.len() != self.public.size() {
            return Err(SealError::CryptoFailure);
        }
        self.private
            .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), wrapped)
            .map(Zeroizing::new)
            .map_err(|_| SealError::CryptoFailure)
    }

    /// Largest input [`Self::wrap`] accepts for this modulus.
    pub fn max_wrap_len(&self) -> usize {
        self.public.size() - 2 * OAEP_HASH_LEN - 2
    }

    /// Exact modulus size in bits.
    pub fn bits(&self) -> usize {
        self.public.n().bits()
    }

    /// Byte length of every wrapped key produced by this pair.
    pub fn wrapped_len(&self) -> usize {
        self.public.size()
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Hex SHA-256 over the public modulus and exponent. Not a secret.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// PKCS#1 PEM of the public half.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Export`] if encoding fails.
    pub fn public_key_pem(&self) -> Result<String, KeyError> {
        self.public
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|_| KeyError::Export)
    }

    /// PKCS#1 PEM of the private half, for callers that persist generated keys.
    ///
    /// The returned buffer is zeroed on drop. Nothing in this crate calls it
    /// implicitly; exposing the key is always an explicit caller decision.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Export`] if encoding fails.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, KeyError> {
        self.private
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|_| KeyError::Export)
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("origin", &self.origin)
            .field("bits", &self.bits())
            .field("fingerprint", &self.fingerprint)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

fn parse_private_pem(pem: &str) -> Result<RsaPrivateKey, KeyError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|_| KeyError::KeyMaterialInvalid("private key is not PKCS#1 or PKCS#8 PEM"))
}

fn parse_public_pem(pem: &str) -> Result<RsaPublicKey, KeyError> {
    RsaPublicKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPublicKey::from_public_key_pem(pem))
        .map_err(|_| KeyError::KeyMaterialInvalid("public key is not PKCS#1 or SPKI PEM"))
}

fn fingerprint_of(public: &RsaPublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public.n().to_bytes_be());
    hasher.update(public.e().to_bytes_be());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, OTHER_PUBLIC_PEM, TEST_PRIVATE_PEM, TEST_PUBLIC_PEM};

    const TEST_PRIVATE_PKCS8_PEM: &str =
        include_str!("../../tests/fixtures/rsa2048_private_pkcs8.pem");
    const TEST_PUBLIC_SPKI_PEM: &str = include_str!("../../tests/fixtures/rsa2048_public_spki.pem");

    #[test]
    fn imports_configured_pkcs1_pair() {
        let km = KeyManager::initialize(Some(TEST_PUBLIC_PEM), Some(TEST_PRIVATE_PEM), 2048)
            .unwrap();
        assert_eq!(km.origin(), KeyOrigin::Imported);
        assert_eq!(km.bits(), 2048);
        assert_eq!(km.fingerprint(), testutil::test_keys().fingerprint());
    }

    #[test]
    fn imports_pkcs8_and_spki_pair() {
        let km = KeyManager::initialize(
            Some(TEST_PUBLIC_SPKI_PEM),
            Some(TEST_PRIVATE_PKCS8_PEM),
            2048,
        )
        .unwrap();
        assert_eq!(km.origin(), KeyOrigin::Imported);
        assert_eq!(km.fingerprint(), testutil::test_keys().fingerprint());
    }

    #[test]
    fn mismatched_pair_falls_back_to_generation() {
        let km = KeyManager::initialize(Some(OTHER_PUBLIC_PEM), Some(TEST_PRIVATE_PEM), 2048)
            .unwrap();
        assert_eq!(km.origin(), KeyOrigin::Generated);
        assert_eq!(km.bits(), 2048);
    }

    #[test]
    fn garbage_material_falls_back_to_generation() {
        let km = KeyManager::initialize(Some("not a pem"), Some("also not a pem"), 2048).unwrap();
        assert_eq!(km.origin(), KeyOrigin::Generated);
    }

    #[test]
    fn modulus_below_2048_bits_falls_back_to_generation() {
        let km = KeyManager::initialize(
            Some(include_str!("../../tests/fixtures/rsa2047_public.pem")),
            Some(include_str!("../../tests/fixtures/rsa2047_private.pem")),
            2048,
        )
        .unwrap();
        assert_eq!(km.origin(), KeyOrigin::Generated);
        assert_eq!(km.bits(), 2048);
    }

    #[test]
    fn import_reports_exact_modulus_bits() {
        let public = include_str!("../../tests/fixtures/rsa2047_public.pem");
        let private = include_str!("../../tests/fixtures/rsa2047_private.pem");
        assert!(matches!(
            KeyManager::import(public, private),
            Err(KeyError::KeyMaterialInvalid(_))
        ));

        let undersized = KeyManager::from_private_key(parse_private_pem(private).unwrap());
        assert_eq!(undersized.bits(), 2047);
    }

    #[test]
    fn half_configured_pair_falls_back_to_generation() {
        let km = KeyManager::initialize(None, Some(TEST_PRIVATE_PEM), 2048).unwrap();
        assert_eq!(km.origin(), KeyOrigin::Generated);
        assert_ne!(km.fingerprint(), testutil::test_keys().fingerprint());
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let km = testutil::test_keys();
        let key = [0x42u8; 32];
        let wrapped = km.wrap(&key).unwrap();
        assert_eq!(wrapped.len(), km.wrapped_len());
        let unwrapped = km.unwrap(&wrapped).unwrap();
        assert_eq!(unwrapped.as_slice(), &key);
    }

    #[test]
    fn wrap_is_randomised() {
        let km = testutil::test_keys();
        let key = [0x07u8; 32];
        assert_ne!(km.wrap(&key).unwrap(), km.wrap(&key).unwrap());
    }

    #[test]
    fn wrap_rejects_oversized_input() {
        let km = testutil::test_keys();
        assert_eq!(km.max_wrap_len(), 190);
        assert!(km.wrap(&[0u8; 190]).is_ok());
        assert_eq!(km.wrap(&[0u8; 191]), Err(SealError::CryptoFailure));
    }

    #[test]
    fn unwrap_failures_are_uniform() {
        let km = testutil::test_keys();
        let mut wrapped = km.wrap(&[0x11u8; 32]).unwrap();

        assert_eq!(km.unwrap(&wrapped[1..]).unwrap_err(), SealError::CryptoFailure);

        let last = wrapped.len() - 1;
        wrapped[last] ^= 0x01;
        assert_eq!(km.unwrap(&wrapped).unwrap_err(), SealError::CryptoFailure);

        let foreign = testutil::other_keys().wrap(&[0x11u8; 32]).unwrap();
        assert_eq!(km.unwrap(&foreign).unwrap_err(), SealError::CryptoFailure);
    }

    #[test]
    fn exported_pems_reimport_to_same_key() {
        let km = testutil::test_keys();
        let public = km.public_key_pem().unwrap();
        let private = km.private_key_pem().unwrap();
        let again =
            KeyManager::initialize(Some(public.as_str()), Some(private.as_str()), 2048).unwrap();
        assert_eq!(again.origin(), KeyOrigin::Imported);
        assert_eq!(again.fingerprint(), km.fingerprint());
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let fp = testutil::test_keys().fingerprint().to_owned();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_output_redacts_private_key() {
        let dbg = format!("{:?}", testutil::test_keys());
        assert!(dbg.contains("[REDACTED]"));
        assert!(dbg.contains("2048"));
    }
}
