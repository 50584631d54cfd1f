//! Single-use enforcement for envelopes.
//!
//! The replay window alone lets the intended principal replay a valid
//! envelope until it expires. When single-use mode is enabled the engine
//! records each envelope's key identifier after a successful unseal and
//! refuses it from then on.
//!
//! The set only needs to remember an identifier for as long as its envelope
//! could still pass the expiry check, so older entries are pruned.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::{mapref::entry::Entry, DashMap};

use crate::envelope::KeyIdentifier;

/// Inserts between opportunistic prunes.
const PRUNE_EVERY: u64 = 1024;

/// Concurrent set of consumed envelope identifiers.
#[derive(Debug)]
pub struct ConsumedSet {
    entries: DashMap<KeyIdentifier, DateTime<Utc>>,
    retention: Duration,
    inserts: AtomicU64,
}

impl ConsumedSet {
    /// Create an empty set that forgets entries sealed more than `retention` ago.
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
            inserts: AtomicU64::new(0),
        }
    }

    /// Mark `key_id` as consumed.
    ///
    /// Returns `false` if it was already consumed. Check and insert are one
    /// atomic step, so two racing unseals of the same envelope cannot both win.
    pub fn try_consume(
        &self,
        key_id: &KeyIdentifier,
        sealed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        let fresh = match self.entries.entry(key_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(sealed_at);
                true
            }
        };

        if fresh && self.inserts.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune(now);
        }
        fresh
    }

    /// Drop entries whose envelopes are past the replay window.
    ///
    /// A retention reaching past the earliest representable time keeps
    /// everything.
    pub fn prune(&self, now: DateTime<Utc>) {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return;
        };
        self.entries.retain(|_, sealed_at| *sealed_at >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
