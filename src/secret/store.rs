//! In-process secret store.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::{SecretHandle, SecretStore};
use crate::error::SecretError;

/// A name-keyed secret store held in memory.
///
/// Registering an existing name replaces the earlier value, mirroring the
/// process-wide "set secret by name" behaviour of container engines.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<BTreeMap<String, SecretHandle>>,
}

impl MemorySecretStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a registered secret by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SecretHandle> {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Return the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Return the number of registered secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return whether no secret has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn register(&self, name: &str, contents: Vec<u8>) -> Result<SecretHandle, SecretError> {
        if name.trim().is_empty() {
            return Err(SecretError::RegistrationFailed {
                name: String::from(name),
                message: String::from("secret name must not be empty"),
            });
        }

        let handle = SecretHandle::new(name, contents);
        let replaced = self
            .secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(String::from(name), handle.clone())
            .is_some();
        debug!(secret = name, replaced, "registered secret");

        Ok(handle)
    }
}
