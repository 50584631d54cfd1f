//! Fixed RSA key pairs shared by unit tests, so tests skip key generation.

use std::sync::{Arc, OnceLock};

use rsa::{pkcs1::DecodeRsaPrivateKey, RsaPrivateKey};

use crate::keys::KeyManager;

pub(crate) const TEST_PRIVATE_PEM: &str = include_str!("../tests/fixtures/rsa2048_private.pem");
pub(crate) const TEST_PUBLIC_PEM: &str = include_str!("../tests/fixtures/rsa2048_public.pem");
pub(crate) const OTHER_PRIVATE_PEM: &str =
    include_str!("../tests/fixtures/rsa2048_other_private.pem");
pub(crate) const OTHER_PUBLIC_PEM: &str =
    include_str!("../tests/fixtures/rsa2048_other_public.pem");

static TEST_KEYS: OnceLock<Arc<KeyManager>> = OnceLock::new();
static OTHER_KEYS: OnceLock<Arc<KeyManager>> = OnceLock::new();

/// The primary fixture key pair.
pub(crate) fn test_keys() -> Arc<KeyManager> {
    TEST_KEYS.get_or_init(|| load(TEST_PRIVATE_PEM)).clone()
}

/// An unrelated key pair, for cross-key failures.
pub(crate) fn other_keys() -> Arc<KeyManager> {
    OTHER_KEYS.get_or_init(|| load(OTHER_PRIVATE_PEM)).clone()
}

fn load(pem: &str) -> Arc<KeyManager> {
    let private = RsaPrivateKey::from_pkcs1_pem(pem).expect("fixture key parses");
    Arc::new(KeyManager::from_private_key(private))
}
