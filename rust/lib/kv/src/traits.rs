use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::KVError;

/// KVStore provides the slot storage the client persists its state in.
///
/// Keys follow a namespaced convention: `session:token`, `session:identity`.
/// Every key is read-write; deleting a missing key is not an error.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Set a key-value pair, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Scan all keys matching a prefix. Returns sorted (key, value) pairs.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;
}

/// Read a JSON-encoded value from a slot.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KVStore,
    key: &str,
) -> Result<Option<T>, KVError> {
    match store.get(key)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| KVError::Serialization(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}

/// Write a value to a slot as JSON.
pub fn set_json<T: Serialize>(store: &dyn KVStore, key: &str, value: &T) -> Result<(), KVError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| KVError::Serialization(format!("{}: {}", key, e)))?;
    store.set(key, &bytes)
}
