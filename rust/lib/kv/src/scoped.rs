use std::sync::Arc;

use crate::error::KVError;
use crate::traits::KVStore;

/// Scoped confines an owner to `{scope}:`-prefixed keys of a shared store.
///
/// Keys passed in and returned from `scan` are relative to the scope.
pub struct Scoped {
    inner: Arc<dyn KVStore>,
    prefix: String,
}

impl Scoped {
    pub fn new(inner: Arc<dyn KVStore>, scope: &str) -> Self {
        Self {
            inner,
            prefix: format!("{}:", scope),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl KVStore for Scoped {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        self.inner.get(&self.full_key(key))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        self.inner.set(&self.full_key(key), value)
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        self.inner.delete(&self.full_key(key))
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let entries = self.inner.scan(&self.full_key(prefix))?;
        Ok(entries
            .into_iter()
            .map(|(k, v)| (k[self.prefix.len()..].to_string(), v))
            .collect())
    }
}
