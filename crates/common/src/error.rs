//! Common error types shared across crates.

use thiserror::Error;

/// Boundary error type returned to HTTP callers.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::Rejected`] → 400
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Internal`] → 500
///
/// Unseal failures of every kind collapse into [`ServiceError::Rejected`] so
/// that callers cannot tell a principal mismatch from an expired or corrupted
/// envelope.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request body was malformed: bad JSON or an undecodable payload.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The envelope was not accepted.
    #[error("envelope rejected")]
    Rejected,

    /// Sealing failed in the crypto layer.
    #[error("encryption failure")]
    EncryptionFailure,

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Rejected => 400,
            ServiceError::EncryptionFailure => 500,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Rejected => "rejected",
            ServiceError::EncryptionFailure => "encryption_failure",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// Message that is safe to expose to callers.
    ///
    /// Internal details are dropped; only bad-request descriptions, which
    /// describe the caller's own input, are passed through.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::BadRequest(msg) => msg.clone(),
            ServiceError::Rejected => "envelope rejected".into(),
            ServiceError::EncryptionFailure => "sealing failed".into(),
            ServiceError::Internal(_) => "internal error".into(),
        }
    }
}
