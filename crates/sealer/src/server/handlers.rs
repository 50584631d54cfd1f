//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::SecondsFormat;
use common::{
    protocol::{
        CredentialResponse, ErrorResponse, HealthResponse, SealRequest, SealResponse,
        UnsealRequest, UnsealResponse,
    },
    ServiceError,
};
use tracing::{error, info, warn};

use super::state::AppState;
use crate::envelope::{self, PrincipalId};
use crate::ident;

/// `POST /v1/seal`: seal a base64 payload for a principal.
///
/// Sealing is CPU-bound (RSA-OAEP plus AES), so the work runs on the blocking
/// pool rather than on the async executor.
pub async fn seal(
    State(state): State<AppState>,
    body: Result<Json<SealRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(req) => req,
        Err(rejection) => return json_rejection(rejection),
    };

    let payload = match STANDARD.decode(req.payload.as_bytes()) {
        Ok(p) => p,
        Err(_) => {
            return error_response(ServiceError::BadRequest(
                "payload is not valid base64".into(),
            ))
        }
    };

    let principal_id = PrincipalId(req.principal_id);
    let sealer = state.sealer.clone();
    let sealed =
        tokio::task::spawn_blocking(move || sealer.seal_envelope(&payload, principal_id)).await;

    match sealed {
        Ok(Ok(env)) => {
            let body = SealResponse {
                envelope: envelope::encode(&env),
                key_id: env.key_id.to_string(),
                sealed_at: env.sealed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => {
            warn!(error = %e, %principal_id, "seal failed");
            error_response(e.into())
        }
        Err(e) => {
            error!(error = %e, "seal task did not complete");
            error_response(ServiceError::Internal(e.to_string()))
        }
    }
}

/// `POST /v1/unseal`: recover a payload from an envelope.
///
/// Every refusal produces the same `rejected` response; the specific reason is
/// only logged.
pub async fn unseal(
    State(state): State<AppState>,
    body: Result<Json<UnsealRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(req) => req,
        Err(rejection) => return json_rejection(rejection),
    };

    let principal_id = PrincipalId(req.principal_id);
    let sealer = state.sealer.clone();
    let opened =
        tokio::task::spawn_blocking(move || sealer.unseal(&req.envelope, principal_id)).await;

    match opened {
        Ok(Ok(payload)) => {
            let body = UnsealResponse {
                payload: STANDARD.encode(payload),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => {
            info!(reason = %e, %principal_id, "unseal rejected");
            error_response(ServiceError::Rejected)
        }
        Err(e) => {
            error!(error = %e, "unseal task did not complete");
            error_response(ServiceError::Internal(e.to_string()))
        }
    }
}

/// `POST /v1/credentials`: issue a fresh random credential.
pub async fn issue_credential() -> impl IntoResponse {
    let body = CredentialResponse {
        credential: ident::generate_credential(),
    };
    (StatusCode::CREATED, Json(body))
}

/// `GET /health`: liveness check with non-secret key metadata.
///
/// The key pair is established before the listener binds, so a responding
/// server is always ready.
pub async fn health(State(state): State<AppState>) -> Response {
    let keys = state.sealer.keys();
    let body = HealthResponse {
        status: "ok".into(),
        key_origin: keys.origin().as_str().into(),
        key_bits: keys.bits(),
        key_fingerprint: keys.fingerprint().to_owned(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Render a [`ServiceError`] as its status code and [`ErrorResponse`] body.
pub fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}

fn json_rejection(rejection: JsonRejection) -> Response {
    let status = rejection.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "payload_too_large"
    } else {
        "bad_request"
    };
    (status, Json(ErrorResponse::new(code, rejection.body_text()))).into_response()
}
