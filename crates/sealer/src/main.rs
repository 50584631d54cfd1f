//! `sealer`: service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Import the configured key pair or generate a fresh one.
//! 4. Build the [`Sealer`] engine around the key pair.
//! 5. Build the Axum router and start the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use sealer::config::Config;
use sealer::keys::{self, KeyManager};
use sealer::server::{self, state::AppState};
use sealer::{telemetry, Sealer};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        single_use = cfg.single_use_envelopes,
        "sealer starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key pair
    // -----------------------------------------------------------------------
    let material = keys::configured_material(&cfg);
    let key_bits = cfg.rsa_key_bits;
    // Generation of a large modulus can take seconds; keep it off the reactor.
    let manager = tokio::task::spawn_blocking(move || {
        KeyManager::initialize(
            material.public_pem.as_deref(),
            material.private_pem.as_deref(),
            key_bits,
        )
    })
    .await
    .context("key initialisation task panicked")?
    .context("failed to establish the service key pair")?;

    // -----------------------------------------------------------------------
    // 4. Engine
    // -----------------------------------------------------------------------
    let sealer = Sealer::new(Arc::new(manager), cfg.seal_policy());

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(AppState::new(sealer), cfg.max_body_bytes);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .await
        .context("HTTP server terminated")?;

    Ok(())
}
