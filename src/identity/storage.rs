//! Dual-tier identifier persistence.
//!
//! Session ids are mirrored into a session-scoped and a durable store under
//! every legacy key; guest ids go through the [`GuestIdStore`] port. Each
//! backend is probed before use on every call, and a backend that fails the
//! probe or an operation is simply left out. Nothing here returns an error.

use std::sync::Arc;

use tracing::debug;

use super::normalize::{normalize, Identifier};
use super::IdentityKind;
use crate::ports::storage::{GuestIdStore, KeyValueStore, StorageError};

/// Keys the session id is written under, preferred first.
pub const SESSION_ID_KEYS: [&str; 2] = ["eco.session_id", "eco_session_id"];

/// Sentinel key used for the trial write/delete.
pub const PROBE_KEY: &str = "__eco_storage_probe__";

/// Result of probing a backend before use.
pub enum BackendAccess<'a> {
    /// The trial write and delete succeeded.
    Available(&'a dyn KeyValueStore),
    /// The backend refused; skip it for this call.
    Unavailable(StorageError),
}

/// Probes `store` with a trial write and delete of [`PROBE_KEY`].
#[must_use]
pub fn probe(store: &dyn KeyValueStore) -> BackendAccess<'_> {
    let trial = store.set(PROBE_KEY, PROBE_KEY).and_then(|()| store.remove(PROBE_KEY));
    match trial {
        Ok(()) => BackendAccess::Available(store),
        Err(err) => BackendAccess::Unavailable(err),
    }
}

/// Session-scoped plus durable storage, and the guest-id store.
pub struct DualTierStorage {
    session: Arc<dyn KeyValueStore>,
    durable: Arc<dyn KeyValueStore>,
    guests: Arc<dyn GuestIdStore>,
}

impl DualTierStorage {
    /// Wires the three backends together.
    #[must_use]
    pub fn new(
        session: Arc<dyn KeyValueStore>,
        durable: Arc<dyn KeyValueStore>,
        guests: Arc<dyn GuestIdStore>,
    ) -> Self {
        Self { session, durable, guests }
    }

    fn tiers(&self) -> [(&'static str, &dyn KeyValueStore); 2] {
        [("session", self.session.as_ref()), ("durable", self.durable.as_ref())]
    }

    /// Reads the persisted identifier of `kind`, if any backend has a valid one.
    #[must_use]
    pub fn read(&self, kind: IdentityKind) -> Option<Identifier> {
        match kind {
            IdentityKind::Guest => match self.guests.load() {
                Ok(candidate) => candidate.as_deref().and_then(normalize),
                Err(err) => {
                    debug!(error = %err, "guest id store unavailable for read");
                    None
                }
            },
            IdentityKind::Session => self.tiers().into_iter().find_map(|(tier, store)| {
                let store = usable(tier, store)?;
                SESSION_ID_KEYS.iter().find_map(|key| match store.get(key) {
                    Ok(candidate) => candidate.as_deref().and_then(normalize),
                    Err(err) => {
                        debug!(tier, key, error = %err, "session id read failed");
                        None
                    }
                })
            }),
        }
    }

    /// Persists `value` everywhere it belongs.
    ///
    /// Returns how many backends accepted it; `0` means the value lives only
    /// in memory for now.
    pub fn write(&self, kind: IdentityKind, value: &Identifier) -> usize {
        match kind {
            IdentityKind::Guest => match self.guests.save(value.as_str()) {
                Ok(()) => 1,
                Err(err) => {
                    debug!(error = %err, "guest id store unavailable for write");
                    0
                }
            },
            IdentityKind::Session => self
                .tiers()
                .into_iter()
                .filter(|(tier, store)| {
                    usable(tier, *store).is_some_and(|store| write_all_keys(tier, store, value))
                })
                .count(),
        }
    }
}

fn usable<'a>(tier: &str, store: &'a dyn KeyValueStore) -> Option<&'a dyn KeyValueStore> {
    match probe(store) {
        BackendAccess::Available(store) => Some(store),
        BackendAccess::Unavailable(err) => {
            debug!(tier, error = %err, "storage backend unavailable");
            None
        }
    }
}

fn write_all_keys(tier: &str, store: &dyn KeyValueStore, value: &Identifier) -> bool {
    let mut written = false;
    for key in SESSION_ID_KEYS {
        match store.set(key, value.as_str()) {
            Ok(()) => written = true,
            Err(err) => debug!(tier, key, error = %err, "session id write failed"),
        }
    }
    written
}
