//! The guest/session identity manager.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tracing::{debug, warn};

use super::headers::{HeaderSource, GUEST_ID_HEADERS, SESSION_ID_HEADERS};
use super::normalize::{normalize, Identifier};
use super::storage::DualTierStorage;
use super::IdentityKind;
use crate::ports::IdGenerator;

/// Both identifiers, as attached to outgoing requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityPair {
    /// The visitor id.
    pub guest_id: Identifier,
    /// The browsing-session id.
    pub session_id: Identifier,
}

impl IdentityPair {
    /// Sets the canonical identity headers on `headers`, replacing old values.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        for (name, id) in [
            (GUEST_ID_HEADERS[0], &self.guest_id),
            (SESSION_ID_HEADERS[0], &self.session_id),
        ] {
            if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
    }
}

#[derive(Default)]
struct IdentityCache {
    guest: Option<Identifier>,
    session: Option<Identifier>,
}

impl IdentityCache {
    fn slot(&mut self, kind: IdentityKind) -> &mut Option<Identifier> {
        match kind {
            IdentityKind::Guest => &mut self.guest,
            IdentityKind::Session => &mut self.session,
        }
    }
}

/// Owns the current guest and session identifiers for one context.
///
/// The in-memory cache is authoritative; storage is consulted only when the
/// cache is empty and written whenever a new value is accepted.
pub struct IdentityManager {
    storage: DualTierStorage,
    id_gen: Arc<dyn IdGenerator>,
    cache: Mutex<IdentityCache>,
}

impl IdentityManager {
    /// Creates a manager with an empty cache.
    #[must_use]
    pub fn new(storage: DualTierStorage, id_gen: Arc<dyn IdGenerator>) -> Self {
        Self { storage, id_gen, cache: Mutex::new(IdentityCache::default()) }
    }

    fn cache(&self) -> MutexGuard<'_, IdentityCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the guest id, loading or creating it on first use.
    pub fn ensure_guest_id(&self) -> Identifier {
        self.ensure(IdentityKind::Guest)
    }

    /// Returns the session id, loading or creating it on first use.
    pub fn ensure_session_id(&self) -> Identifier {
        self.ensure(IdentityKind::Session)
    }

    /// Ensures both identifiers.
    pub fn ensure_guest_and_session(&self) -> IdentityPair {
        IdentityPair { guest_id: self.ensure_guest_id(), session_id: self.ensure_session_id() }
    }

    /// The cached guest id, without touching storage.
    #[must_use]
    pub fn current_guest_id(&self) -> Option<Identifier> {
        self.cache().guest.clone()
    }

    /// The cached session id, without touching storage.
    #[must_use]
    pub fn current_session_id(&self) -> Option<Identifier> {
        self.cache().session.clone()
    }

    /// Adopts `candidate` as the guest id if it is valid.
    ///
    /// Returns the accepted value, or `None` if rejected, in which case the
    /// previous guest id stays current.
    pub fn remember_guest_id(&self, candidate: &str) -> Option<Identifier> {
        self.remember(IdentityKind::Guest, candidate)
    }

    /// Adopts `candidate` as the session id if it is valid.
    pub fn remember_session_id(&self, candidate: &str) -> Option<Identifier> {
        self.remember(IdentityKind::Session, candidate)
    }

    /// Adopts a guest id announced in response headers.
    pub fn remember_guest_id_from_response<'a>(
        &self,
        source: impl Into<HeaderSource<'a>>,
    ) -> Option<Identifier> {
        self.remember_from(IdentityKind::Guest, source.into())
    }

    /// Adopts a session id announced in response headers.
    pub fn remember_session_id_from_response<'a>(
        &self,
        source: impl Into<HeaderSource<'a>>,
    ) -> Option<Identifier> {
        self.remember_from(IdentityKind::Session, source.into())
    }

    fn remember_from(&self, kind: IdentityKind, source: HeaderSource<'_>) -> Option<Identifier> {
        source.first_of(kind.header_aliases()).and_then(|value| self.remember(kind, value))
    }

    fn ensure(&self, kind: IdentityKind) -> Identifier {
        let mut cache = self.cache();
        let slot = cache.slot(kind);
        if let Some(id) = slot.as_ref() {
            return id.clone();
        }

        let id = match self.storage.read(kind) {
            Some(stored) => stored,
            None => {
                let fresh = self.generate(kind);
                let persisted = self.storage.write(kind, &fresh);
                debug!(kind = kind.as_str(), persisted, "generated identifier");
                fresh
            }
        };
        *slot = Some(id.clone());
        id
    }

    fn remember(&self, kind: IdentityKind, candidate: &str) -> Option<Identifier> {
        let Some(id) = normalize(candidate) else {
            debug!(kind = kind.as_str(), "ignoring invalid identifier candidate");
            return None;
        };

        let mut cache = self.cache();
        let slot = cache.slot(kind);
        // Written even when unchanged so a recovered backend catches up.
        let persisted = self.storage.write(kind, &id);
        debug!(kind = kind.as_str(), persisted, "adopted server identifier");
        *slot = Some(id.clone());
        Some(id)
    }

    fn generate(&self, kind: IdentityKind) -> Identifier {
        let candidate = self.id_gen.generate_id();
        normalize(&candidate).unwrap_or_else(|| {
            warn!(kind = kind.as_str(), "id generator produced an invalid id; using uuid fallback");
            Identifier::random()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::id_gen::UuidGenerator;
    use crate::adapters::live::storage::{KeyValueGuestStore, MemoryStore};
    use crate::ports::{GuestIdStore, KeyValueStore};
    use crate::testing::FlakyStore;

    const SERVER_ID: &str = "3fae4d1e-46d2-4b82-9f0e-5a6b6e9c8a11";

    struct BrokenGenerator;
    impl IdGenerator for BrokenGenerator {
        fn generate_id(&self) -> String {
            String::new()
        }
    }

    fn manager_with(
        session: Arc<dyn KeyValueStore>,
        durable: Arc<dyn KeyValueStore>,
        id_gen: Arc<dyn IdGenerator>,
    ) -> IdentityManager {
        let guests: Arc<dyn GuestIdStore> = Arc::new(KeyValueGuestStore::new(Arc::clone(&durable)));
        IdentityManager::new(DualTierStorage::new(session, durable, guests), id_gen)
    }

    fn manager() -> IdentityManager {
        manager_with(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(UuidGenerator),
        )
    }

    #[test]
    fn ensure_is_stable() {
        let ids = manager();
        assert_eq!(ids.ensure_guest_id(), ids.ensure_guest_id());
        assert_eq!(ids.ensure_session_id(), ids.ensure_session_id());
        assert_ne!(ids.ensure_guest_id(), ids.ensure_session_id());
    }

    #[test]
    fn invalid_candidate_keeps_previous_id() {
        let ids = manager();
        let before = ids.ensure_guest_id();
        assert_eq!(ids.remember_guest_id("not-a-uuid"), None);
        assert_eq!(ids.ensure_guest_id(), before);
    }

    #[test]
    fn header_value_becomes_current_guest_id() {
        let ids = manager();
        ids.ensure_guest_id();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-guest-id",
            HeaderValue::from_static("3FAE4D1E-46D2-4B82-9F0E-5A6B6E9C8A11"),
        );

        let adopted = ids.remember_guest_id_from_response(&headers);

        assert_eq!(adopted.as_ref().map(Identifier::as_str), Some(SERVER_ID));
        assert_eq!(ids.ensure_guest_id().as_str(), SERVER_ID);
    }

    #[test]
    fn session_header_from_record_is_adopted_and_persisted() {
        let durable = Arc::new(MemoryStore::new());
        let ids = manager_with(
            Arc::new(MemoryStore::new()),
            Arc::clone(&durable) as Arc<dyn KeyValueStore>,
            Arc::new(UuidGenerator),
        );
        let record = std::collections::HashMap::from([(
            "X-Session-Id".to_string(),
            SERVER_ID.to_string(),
        )]);

        assert!(ids.remember_session_id_from_response(&record).is_some());
        assert_eq!(durable.get("eco_session_id").unwrap().as_deref(), Some(SERVER_ID));
    }

    #[test]
    fn existing_storage_is_reused_by_a_new_manager() {
        let session: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let durable: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let first =
            manager_with(Arc::clone(&session), Arc::clone(&durable), Arc::new(UuidGenerator));
        let pair = first.ensure_guest_and_session();

        let second = manager_with(session, durable, Arc::new(UuidGenerator));
        assert_eq!(second.ensure_guest_and_session(), pair);
    }

    #[test]
    fn works_with_no_storage_at_all() {
        let ids = manager_with(
            Arc::new(FlakyStore::broken()),
            Arc::new(FlakyStore::broken()),
            Arc::new(UuidGenerator),
        );
        let session = ids.ensure_session_id();
        let guest = ids.ensure_guest_id();
        assert_eq!(ids.ensure_session_id(), session);
        assert_eq!(ids.ensure_guest_id(), guest);
        assert_eq!(
            ids.remember_session_id(SERVER_ID).map(String::from),
            Some(SERVER_ID.to_string())
        );
        assert_eq!(ids.current_session_id().map(String::from), Some(SERVER_ID.to_string()));
    }

    #[test]
    fn remembering_the_same_id_repairs_a_recovered_backend() {
        let durable = Arc::new(FlakyStore::broken());
        let ids = manager_with(
            Arc::new(MemoryStore::new()),
            Arc::clone(&durable) as Arc<dyn KeyValueStore>,
            Arc::new(UuidGenerator),
        );
        let session = ids.ensure_session_id();
        assert_eq!(durable.peek("eco.session_id"), None);

        durable.set_broken(false);
        assert_eq!(ids.remember_session_id(session.as_str()), Some(session.clone()));

        assert_eq!(durable.peek("eco.session_id").as_deref(), Some(session.as_str()));
        assert_eq!(durable.peek("eco_session_id").as_deref(), Some(session.as_str()));
    }

    #[test]
    fn broken_generator_falls_back_to_uuid() {
        let ids = manager_with(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(BrokenGenerator),
        );
        let id = ids.ensure_guest_id();
        assert_eq!(normalize(id.as_str()), Some(id));
    }

    #[test]
    fn current_ids_do_not_generate() {
        let ids = manager();
        assert_eq!(ids.current_guest_id(), None);
        let guest = ids.ensure_guest_id();
        assert_eq!(ids.current_guest_id(), Some(guest));
        assert_eq!(ids.current_session_id(), None);
    }

    #[test]
    fn pair_is_applied_as_headers() {
        let ids = manager();
        let pair = ids.ensure_guest_and_session();
        let mut headers = HeaderMap::new();
        pair.apply_headers(&mut headers);
        assert_eq!(headers.get("x-eco-guest-id").unwrap(), pair.guest_id.as_str());
        assert_eq!(headers.get("x-eco-session-id").unwrap(), pair.session_id.as_str());
    }
}
