//! Storage ports: string key/value stores and guest-id persistence.

use thiserror::Error;

/// Why a storage backend refused an operation.
///
/// None of these ever reach callers of the identity manager; they only decide
/// whether a backend takes part in a read or write.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend is disabled or blocked (private mode, policy, missing medium).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Underlying I/O failure.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data could not be decoded or encoded.
    #[error("storage data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A string-to-string store in the shape of browser web storage.
///
/// Used twice: once session-scoped, once durable.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Persistence for the long-lived guest identifier.
///
/// Owned by a separate identity-persistence module; the core only loads and
/// saves through it and never trusts what it loads.
pub trait GuestIdStore: Send + Sync {
    /// Loads the persisted guest id candidate, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage is unavailable.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Persists a guest id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage is unavailable.
    fn save(&self, guest_id: &str) -> Result<(), StorageError>;
}
