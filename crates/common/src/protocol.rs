//! Request and response types exchanged over the HTTP boundary.
//!
//! Binary payloads travel as standard base64 strings; sealed envelopes travel
//! as the opaque transport string produced by the envelope codec.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Seal endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /v1/seal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealRequest {
    /// Principal the envelope is bound to.
    pub principal_id: i64,
    /// Payload bytes, standard base64.
    pub payload: String,
}

/// Successful response body for `POST /v1/seal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealResponse {
    /// Opaque transport string to hand back to `POST /v1/unseal`.
    pub envelope: String,
    /// Key identifier of the envelope, for correlation and auditing.
    pub key_id: String,
    /// RFC 3339 creation time of the envelope.
    pub sealed_at: String,
}

// ---------------------------------------------------------------------------
// Unseal endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /v1/unseal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsealRequest {
    /// Principal the caller acts for; must match the envelope binding.
    pub principal_id: i64,
    /// Transport string previously returned by `POST /v1/seal`.
    pub envelope: String,
}

/// Successful response body for `POST /v1/unseal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsealResponse {
    /// Recovered payload bytes, standard base64.
    pub payload: String,
}

// ---------------------------------------------------------------------------
// Credentials endpoint
// ---------------------------------------------------------------------------

/// Response body for `POST /v1/credentials`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialResponse {
    /// Freshly issued credential. Storing it is the caller's job.
    pub credential: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"rejected"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.public_message())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status, always `"ok"` once the server is up.
    pub status: String,
    /// Where the key pair came from: `"imported"` or `"generated"`.
    pub key_origin: String,
    /// Modulus size of the key pair in bits.
    pub key_bits: usize,
    /// Hex SHA-256 fingerprint of the public key.
    pub key_fingerprint: String,
}
