//! Shared fixtures for the integration tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sealer::engine::Clock;
use sealer::{KeyManager, SealPolicy, Sealer};

pub const PRIVATE_PEM: &str = include_str!("../fixtures/rsa2048_private.pem");
pub const PUBLIC_PEM: &str = include_str!("../fixtures/rsa2048_public.pem");

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Key manager over the fixture key pair, loaded the way the binary does it.
pub fn fixture_keys() -> Arc<KeyManager> {
    let keys = KeyManager::initialize(Some(PUBLIC_PEM), Some(PRIVATE_PEM), 2048)
        .expect("fixture keys load");
    Arc::new(keys)
}

/// Engine with the default policy and wall-clock time.
#[allow(dead_code)] // not every test binary needs both constructors
pub fn sealer() -> Sealer {
    Sealer::new(fixture_keys(), SealPolicy::default())
}

/// Engine whose clock is pinned to `now`.
#[allow(dead_code)]
pub fn sealer_at(keys: Arc<KeyManager>, now: DateTime<Utc>) -> Sealer {
    Sealer::with_clock(keys, SealPolicy::default(), Arc::new(FixedClock(now)))
}
