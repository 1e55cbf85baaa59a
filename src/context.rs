//! Session context bundling the ports and the services built on them.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::adapters::live::{
    FileStore, KeyValueGuestStore, LiveHttpTransport, MemoryStore, TokioTimer, UuidGenerator,
};
use crate::adapters::recording::{RecordingTransport, SharedRecorder};
use crate::adapters::replaying::ReplayingTransport;
use crate::api::ApiClient;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::config::Config;
use crate::health::HealthPoller;
use crate::identity::{DualTierStorage, IdentityManager};
use crate::net::SafeFetch;
use crate::ports::{GuestIdStore, HttpTransport, IdGenerator, KeyValueStore, Timer};

/// The ports a context is assembled from.
pub struct Ports {
    /// Network transport.
    pub transport: Arc<dyn HttpTransport>,
    /// Session-scoped key/value store.
    pub session_store: Arc<dyn KeyValueStore>,
    /// Durable key/value store.
    pub durable_store: Arc<dyn KeyValueStore>,
    /// Guest id persistence.
    pub guest_store: Arc<dyn GuestIdStore>,
    /// Identifier generator.
    pub id_gen: Arc<dyn IdGenerator>,
    /// Timer used for request timeouts; `None` races the runtime's own timer.
    pub timer: Option<Arc<dyn Timer>>,
}

/// Owns one client session: identity caches, fetcher and transport.
///
/// Every constructor wires a different transport (live, recording,
/// replaying); the rest of the stack is shared. Nothing here is global, so
/// two contexts never see each other's identifiers.
pub struct SessionContext {
    /// Network transport underneath the fetcher.
    pub transport: Arc<dyn HttpTransport>,
    /// Timer installed in the fetcher, if any.
    pub timer: Option<Arc<dyn Timer>>,
    /// Guest/session identity manager.
    pub identity: Arc<IdentityManager>,
    /// Resilient fetch wrapper.
    pub fetcher: Arc<SafeFetch>,
    /// Optional cassette recorder; written to disk on drop.
    recorder: Option<SharedRecorder>,
}

impl SessionContext {
    /// Assembles a context from explicit ports.
    #[must_use]
    pub fn from_ports(ports: Ports, config: &Config) -> Self {
        let storage =
            DualTierStorage::new(ports.session_store, ports.durable_store, ports.guest_store);
        let identity = Arc::new(IdentityManager::new(storage, ports.id_gen));

        let mut fetcher =
            SafeFetch::new(Arc::clone(&ports.transport)).with_timeout(config.fetch_timeout);
        if let Some(timer) = &ports.timer {
            fetcher = fetcher.with_timer(Arc::clone(timer));
        }

        Self {
            transport: ports.transport,
            timer: ports.timer,
            identity,
            fetcher: Arc::new(fetcher),
            recorder: None,
        }
    }

    /// Creates a context talking to the configured API base URL.
    #[must_use]
    pub fn live(config: &Config) -> Self {
        let transport = Arc::new(LiveHttpTransport::new(config.api_base_url.clone()));
        Self::from_ports(local_ports(config, transport), config)
    }

    /// Creates a live context that also records every HTTP exchange.
    ///
    /// The cassette is written to `path` when the context is dropped.
    #[must_use]
    pub fn recording(config: &Config, path: &Path) -> Self {
        let recorder: SharedRecorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            "eco-session",
            config.api_base_url.as_str(),
        )));
        let live: Arc<dyn HttpTransport> =
            Arc::new(LiveHttpTransport::new(config.api_base_url.clone()));
        let transport = Arc::new(RecordingTransport::new(live, Arc::clone(&recorder)));

        let mut ctx = Self::from_ports(local_ports(config, transport), config);
        ctx.recorder = Some(recorder);
        ctx
    }

    /// Creates a context whose HTTP exchanges are served from a cassette.
    ///
    /// Storage is still local, so identifiers persist as they would live.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(config: &Config, path: &Path) -> Result<Self, String> {
        let cassette = CassetteReplayer::load(path)?;
        debug!(
            cassette = %cassette.name,
            origin = %cassette.origin,
            interactions = cassette.interactions.len(),
            "replaying cassette"
        );
        let transport = Arc::new(ReplayingTransport::new(CassetteReplayer::new(&cassette)));
        let mut ports = local_ports(config, transport);
        // Replayed responses resolve immediately; the runtime timer is enough.
        ports.timer = None;
        Ok(Self::from_ports(ports, config))
    }

    /// Picks live, recording or replaying from the config.
    ///
    /// # Errors
    ///
    /// Returns an error if both modes are requested or the replay cassette
    /// cannot be loaded.
    pub fn from_config(config: &Config) -> Result<Self, String> {
        match (&config.record_path, &config.replay_path) {
            (Some(_), Some(_)) => Err("ECO_RECORD and ECO_REPLAY cannot be combined".to_string()),
            (Some(path), None) => Ok(Self::recording(config, path)),
            (None, Some(path)) => Self::replaying(config, path),
            (None, None) => Ok(Self::live(config)),
        }
    }

    /// A health poller sharing this context's fetcher.
    #[must_use]
    pub fn health_poller(&self) -> HealthPoller {
        HealthPoller::new(Arc::clone(&self.fetcher))
    }

    /// An API client sharing this context's identity and fetcher.
    #[must_use]
    pub fn api_client(&self) -> ApiClient {
        ApiClient::new(Arc::clone(&self.identity), Arc::clone(&self.fetcher))
    }

    /// Timers still scheduled on the installed timer.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timer.as_ref().map_or(0, |timer| timer.pending())
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            let recorder = recorder.lock().unwrap_or_else(PoisonError::into_inner);
            match recorder.save() {
                Ok(path) => {
                    info!(path = %path.display(), interactions = recorder.len(), "cassette saved");
                }
                Err(e) => warn!(error = %e, "failed to write cassette"),
            }
        }
    }
}

/// In-memory session tier, file-backed durable tier, uuids and tokio timers.
fn local_ports(config: &Config, transport: Arc<dyn HttpTransport>) -> Ports {
    let durable: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.durable_store_path()));
    Ports {
        transport,
        session_store: Arc::new(MemoryStore::new()),
        guest_store: Arc::new(KeyValueGuestStore::new(Arc::clone(&durable))),
        durable_store: durable,
        id_gen: Arc::new(UuidGenerator),
        timer: Some(Arc::new(TokioTimer::new())),
    }
}
