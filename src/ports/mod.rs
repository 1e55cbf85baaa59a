//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the resilience core and something
//! it does not own (the network, browser-style storage, the guest-id
//! persistence module, randomness, timers). Implementations live in
//! `src/adapters/`.

pub mod http;
pub mod id_gen;
pub mod storage;
pub mod timer;

pub use http::{FetchRequest, FetchResponse, HttpTransport, TransportFuture};
pub use id_gen::IdGenerator;
pub use storage::{GuestIdStore, KeyValueStore, StorageError};
pub use timer::{Timer, TimerCallback, TimerId};
