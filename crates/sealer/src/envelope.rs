//! Sealed envelope structure and its transport encoding.
//!
//! # Transport format
//!
//! ```text
//! base64url-no-pad(JSON {
//!     "v":            1,
//!     "ciphertext":   base64url-no-pad(AES-256-GCM-SIV ciphertext + tag),
//!     "wrapped_key":  base64url-no-pad(RSA-OAEP-SHA256(session key)),
//!     "iv":           base64url-no-pad(12-byte nonce),
//!     "principal_id": integer,
//!     "sealed_at":    RFC 3339 UTC timestamp,
//!     "key_id":       32 upper-case hex characters
//! })
//! ```
//!
//! The outer alphabet is URL- and header-safe and needs no JSON escaping.
//! Decoding ignores fields it does not know, so later versions may add fields
//! without breaking this one. Everything is validated here, before any
//! cryptography runs.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{NONCE_LEN, TAG_LEN};
use crate::error::SealError;
use crate::ident::{generate_identifier, KEY_IDENTIFIER_BYTES};

/// Structure version written into every envelope.
pub const ENVELOPE_VERSION: u8 = 1;

/// Identity an envelope is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for PrincipalId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Opaque per-envelope label used for auditing and correlation. Not a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyIdentifier(String);

impl KeyIdentifier {
    /// Draw a fresh identifier.
    pub fn generate() -> Self {
        Self(generate_identifier(KEY_IDENTIFIER_BYTES))
    }

    /// Accept `s` if it has the shape of a generated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::MalformedEnvelope`] otherwise.
    pub fn parse(s: &str) -> Result<Self, SealError> {
        let well_formed = s.len() == KEY_IDENTIFIER_BYTES * 2
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b));
        if !well_formed {
            return Err(SealError::MalformedEnvelope);
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sealed payload. Immutable once built; unsealing only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// AEAD output: ciphertext followed by the authentication tag.
    pub ciphertext: Vec<u8>,
    /// One-time session key encrypted under the service public key.
    pub wrapped_key: Vec<u8>,
    /// Nonce used for `ciphertext`.
    pub iv: [u8; NONCE_LEN],
    pub principal_id: PrincipalId,
    pub sealed_at: DateTime<Utc>,
    pub key_id: KeyIdentifier,
}

impl Envelope {
    /// Header bytes authenticated alongside the ciphertext.
    ///
    /// Layout: `"v1" || principal_id (i64 BE) || sealed_at seconds (i64 BE)
    /// || sealed_at subsecond nanos (u32 BE) || key_id`.
    pub fn associated_data(&self) -> Vec<u8> {
        associated_data(self.principal_id, self.sealed_at, &self.key_id)
    }
}

pub(crate) fn associated_data(
    principal_id: PrincipalId,
    sealed_at: DateTime<Utc>,
    key_id: &KeyIdentifier,
) -> Vec<u8> {
    let mut aad = Vec::with_capacity(2 + 8 + 8 + 4 + key_id.as_str().len());
    aad.extend_from_slice(b"v1");
    aad.extend_from_slice(&principal_id.0.to_be_bytes());
    aad.extend_from_slice(&sealed_at.timestamp().to_be_bytes());
    aad.extend_from_slice(&sealed_at.timestamp_subsec_nanos().to_be_bytes());
    aad.extend_from_slice(key_id.as_str().as_bytes());
    aad
}

/// On-the-wire field layout; binary fields are still base64 text here.
#[derive(Deserialize)]
struct WireEnvelope {
    v: u8,
    ciphertext: String,
    wrapped_key: String,
    iv: String,
    principal_id: i64,
    sealed_at: DateTime<Utc>,
    key_id: String,
}

/// Serialise an envelope into its transport string.
pub fn encode(envelope: &Envelope) -> String {
    let json = serde_json::json!({
        "v": ENVELOPE_VERSION,
        "ciphertext": URL_SAFE_NO_PAD.encode(&envelope.ciphertext),
        "wrapped_key": URL_SAFE_NO_PAD.encode(&envelope.wrapped_key),
        "iv": URL_SAFE_NO_PAD.encode(envelope.iv),
        "principal_id": envelope.principal_id.0,
        "sealed_at": envelope.sealed_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        "key_id": envelope.key_id.as_str(),
    });
    URL_SAFE_NO_PAD.encode(json.to_string())
}

/// Parse and validate a transport string.
///
/// # Errors
///
/// Returns [`SealError::MalformedEnvelope`] if the outer encoding, the JSON
/// structure, the version, or any field's type or size is wrong.
pub fn decode(transport: &str) -> Result<Envelope, SealError> {
    let raw = URL_SAFE_NO_PAD
        .decode(transport.trim())
        .map_err(|_| SealError::MalformedEnvelope)?;
    let wire: WireEnvelope =
        serde_json::from_slice(&raw).map_err(|_| SealError::MalformedEnvelope)?;

    if wire.v != ENVELOPE_VERSION {
        return Err(SealError::MalformedEnvelope);
    }

    let iv: [u8; NONCE_LEN] = decode_field(&wire.iv)?
        .try_into()
        .map_err(|_| SealError::MalformedEnvelope)?;

    let ciphertext = decode_field(&wire.ciphertext)?;
    if ciphertext.len() < TAG_LEN {
        return Err(SealError::MalformedEnvelope);
    }

    let wrapped_key = decode_field(&wire.wrapped_key)?;
    if wrapped_key.is_empty() {
        return Err(SealError::MalformedEnvelope);
    }

    Ok(Envelope {
        ciphertext,
        wrapped_key,
        iv,
        principal_id: PrincipalId(wire.principal_id),
        sealed_at: wire.sealed_at,
        key_id: KeyIdentifier::parse(&wire.key_id)?,
    })
}

fn decode_field(value: &str) -> Result<Vec<u8>, SealError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| SealError::MalformedEnvelope)
}
