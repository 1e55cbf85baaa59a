//! Live adapters for real external interactions.

pub mod http;
pub mod id_gen;
pub mod storage;
pub mod timer;

pub use http::LiveHttpTransport;
pub use id_gen::UuidGenerator;
pub use storage::{FileStore, KeyValueGuestStore, MemoryStore};
pub use timer::TokioTimer;
