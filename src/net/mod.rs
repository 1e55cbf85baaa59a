//! Resilient request plumbing: cancellation primitives and `SafeFetch`.

pub mod abort;
pub mod cleanup;
pub mod error;
pub mod fetch;

pub use abort::{AbortController, AbortReason, AbortSignal, ListenerId};
pub use cleanup::CleanupStack;
pub use error::FetchError;
pub use fetch::{FetchInit, FetchInput, FetchOutcome, SafeFetch, DEFAULT_TIMEOUT};
