//! Anonymous guest/session identity.
//!
//! Two identifiers per context, each a lowercase UUID v4:
//!
//! - `guest_id`: long-lived visitor id, persisted by the guest-id store.
//! - `session_id`: one browsing session, persisted to session-scoped and
//!   durable storage under every legacy key.
//!
//! [`IdentityManager`] owns the in-memory cache; storage is best-effort and
//! its absence never stops the manager from answering.

pub mod headers;
pub mod manager;
pub mod normalize;
pub mod storage;

pub use headers::{HeaderSource, GUEST_ID_HEADERS, SESSION_ID_HEADERS};
pub use manager::{IdentityManager, IdentityPair};
pub use normalize::{normalize, normalize_value, Identifier};
pub use storage::{BackendAccess, DualTierStorage, SESSION_ID_KEYS};

/// Which of the two identifiers an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    /// The long-lived anonymous visitor id.
    Guest,
    /// The per-browsing-session id.
    Session,
}

impl IdentityKind {
    /// Response header aliases carrying this identifier, in priority order.
    #[must_use]
    pub fn header_aliases(self) -> &'static [&'static str] {
        match self {
            Self::Guest => &GUEST_ID_HEADERS,
            Self::Session => &SESSION_ID_HEADERS,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest_id",
            Self::Session => "session_id",
        }
    }
}
