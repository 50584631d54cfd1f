//! Random opaque identifiers and issued credentials.
//!
//! Every call draws straight from the OS CSPRNG; no generator state is kept
//! between calls.

use aes_gcm_siv::aead::{rand_core::RngCore, OsRng};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// Random bytes behind an envelope key identifier (32 hex characters).
pub const KEY_IDENTIFIER_BYTES: usize = 16;

/// Literal marker at the start of every issued credential.
pub const CREDENTIAL_PREFIX: &str = "sf_";

/// Random bytes behind a credential; 24 bytes encode to exactly 32 characters.
const CREDENTIAL_RANDOM_BYTES: usize = 24;

/// Total length of an issued credential, prefix included.
pub const CREDENTIAL_LEN: usize = CREDENTIAL_PREFIX.len() + 32;

/// Draw `byte_len` random bytes and return them as upper-case hex.
///
/// The result is always `2 * byte_len` characters long.
pub fn generate_identifier(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

/// Generate a URL-safe credential of [`CREDENTIAL_LEN`] characters.
///
/// The [`CREDENTIAL_PREFIX`] only helps humans and routing rules spot a
/// credential; it carries no security meaning.
pub fn generate_credential() -> String {
    let mut bytes = [0u8; CREDENTIAL_RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{CREDENTIAL_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Check that `text` *looks like* a credential from [`generate_credential`].
///
/// **This is not an authentication check.** It only inspects prefix, length
/// and alphabet, so any well-formed string passes, including ones this
/// service never issued. Callers deciding whether to authorise a request must
/// look the credential up in their own store.
pub fn validate_credential_shape(text: &str) -> bool {
    let Some(body) = text.strip_prefix(CREDENTIAL_PREFIX) else {
        return false;
    };
    text.len() == CREDENTIAL_LEN
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
