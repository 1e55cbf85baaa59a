//! Business API client: identity headers out, server identifiers back in.

use std::sync::Arc;

use crate::identity::IdentityManager;
use crate::net::{FetchInit, FetchOutcome, SafeFetch};

/// Issues API requests on behalf of the current guest and session.
///
/// Requests are sent once; there is no retry, queueing or de-duplication.
pub struct ApiClient {
    identity: Arc<IdentityManager>,
    fetcher: Arc<SafeFetch>,
}

impl ApiClient {
    /// Creates a client sharing the context's identity manager and fetcher.
    #[must_use]
    pub fn new(identity: Arc<IdentityManager>, fetcher: Arc<SafeFetch>) -> Self {
        Self { identity, fetcher }
    }

    /// Sends a request to `path` with the identity headers attached.
    ///
    /// Identifiers announced in the response headers replace the local ones.
    pub async fn request(&self, path: &str, mut init: FetchInit) -> FetchOutcome {
        let pair = self.identity.ensure_guest_and_session();
        let mut headers = init.headers.take().unwrap_or_default();
        pair.apply_headers(&mut headers);
        init.headers = Some(headers);

        let outcome = self.fetcher.fetch(path, init).await;
        if let Some(response) = outcome.response() {
            self.identity.remember_guest_id_from_response(response);
            self.identity.remember_session_id_from_response(response);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::id_gen::UuidGenerator;
    use crate::adapters::live::storage::{KeyValueGuestStore, MemoryStore};
    use crate::identity::DualTierStorage;
    use crate::ports::{FetchResponse, HttpTransport, KeyValueStore};
    use crate::testing::{Reply, ScriptedTransport};
    use reqwest::header::HeaderValue;

    const SERVER_GUEST: &str = "5c1d2e3f-4a5b-4c6d-9e7f-8a9b0c1d2e3f";

    fn client(transport: &Arc<ScriptedTransport>) -> (ApiClient, Arc<IdentityManager>) {
        let durable: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let storage = DualTierStorage::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&durable),
            Arc::new(KeyValueGuestStore::new(durable)),
        );
        let identity = Arc::new(IdentityManager::new(storage, Arc::new(UuidGenerator)));
        let fetcher = Arc::new(SafeFetch::new(Arc::clone(transport) as Arc<dyn HttpTransport>));
        (ApiClient::new(Arc::clone(&identity), fetcher), identity)
    }

    #[tokio::test]
    async fn attaches_identity_headers() {
        let transport = Arc::new(ScriptedTransport::new([Reply::json(204, "")]));
        let (api, identity) = client(&transport);

        let outcome = api.request("/api/feedback", FetchInit::default()).await;

        assert!(outcome.ok());
        let sent = &transport.requests()[0];
        let guest = identity.current_guest_id().unwrap();
        assert_eq!(sent.headers.get("x-eco-guest-id").unwrap(), guest.as_str());
        assert!(sent.headers.contains_key("x-eco-session-id"));
    }

    #[tokio::test]
    async fn adopts_server_issued_guest_id() {
        let mut response = FetchResponse::new(200, "{}");
        response.headers.insert("x-eco-guest-id", HeaderValue::from_static(SERVER_GUEST));
        let transport = Arc::new(ScriptedTransport::new([Reply::Respond(response)]));
        let (api, identity) = client(&transport);

        api.request("/api/meditations", FetchInit::default()).await;

        assert_eq!(identity.ensure_guest_id().as_str(), SERVER_GUEST);
    }

    #[tokio::test]
    async fn failed_request_keeps_local_ids() {
        let transport = Arc::new(ScriptedTransport::new([Reply::Fail("offline")]));
        let (api, identity) = client(&transport);
        let before = identity.ensure_guest_and_session();

        let outcome = api.request("/api/feedback", FetchInit::default()).await;

        assert!(!outcome.ok());
        assert_eq!(identity.ensure_guest_and_session(), before);
    }
}
