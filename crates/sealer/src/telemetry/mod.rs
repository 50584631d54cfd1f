//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No payloads or key material** may appear in any span attribute or log
//!   field. Key identifiers, principal ids and the public key fingerprint are
//!   not secrets and may be logged.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::init_telemetry;
