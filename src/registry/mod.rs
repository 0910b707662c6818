//! Registry credential accumulation and materialization.
//!
//! [`RegistryConfig`] collects `(address, username, secret)` triples through
//! chained `with_*` calls. Each call consumes the value and returns the
//! updated one, so cloned branches never observe each other's changes.
//!
//! Materialization resolves every secret, renders a Docker-style
//! `config.json`, and registers it with a [`SecretStore`]:
//!
//! ```json
//! {"auths":{"docker.io":{"auth":"<base64 user:secret>"},"ghcr.io":{"auth":"..."}}}
//! ```
//!
//! Addresses are emitted in sorted order, so identical credentials always
//! produce byte-identical output and therefore the same content-derived
//! secret name.
//!
//! [`SecretStore`]: crate::secret::SecretStore

mod materialize;
mod mount;

use crate::secret::SecretRef;

pub use mount::SecretMount;

/// Prefix of content-derived secret names when none is configured.
pub const DEFAULT_SECRET_PREFIX: &str = "registry-config";

/// One registry credential. `Debug` output redacts the secret.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    address: String,
    username: String,
    secret: SecretRef,
}

impl RegistryAuth {
    /// Create a credential for `address`.
    #[must_use]
    pub fn new(address: impl Into<String>, username: impl Into<String>, secret: SecretRef) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            secret,
        }
    }

    /// Return the registry address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Return the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Return the secret reference.
    #[must_use]
    pub const fn secret(&self) -> &SecretRef {
        &self.secret
    }
}

/// An accumulator of registry credentials.
///
/// # Examples
///
/// ```
/// use regconfig::registry::RegistryConfig;
/// use regconfig::secret::SecretRef;
///
/// let config = RegistryConfig::new()
///     .with_registry_auth("ghcr.io", "octocat", SecretRef::plaintext("old"))
///     .with_registry_auth("ghcr.io", "octocat", SecretRef::plaintext("new"));
///
/// assert_eq!(config.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    auths: Vec<RegistryAuth>,
    secret_prefix: Option<String>,
}

impl RegistryConfig {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add credentials for `address`, replacing any earlier entry for it.
    #[must_use]
    pub fn with_registry_auth(
        self,
        address: impl Into<String>,
        username: impl Into<String>,
        secret: SecretRef,
    ) -> Self {
        self.with_auth(RegistryAuth::new(address, username, secret))
    }

    /// Add a prepared credential, replacing any earlier entry for its address.
    #[must_use]
    pub fn with_auth(self, auth: RegistryAuth) -> Self {
        let mut updated = self.without_registry_auth(auth.address());
        updated.auths.push(auth);
        updated
    }

    /// Remove every credential for `address`. Absent addresses are ignored.
    #[must_use]
    pub fn without_registry_auth(mut self, address: &str) -> Self {
        self.auths.retain(|auth| auth.address != address);
        self
    }

    /// Override the prefix used for content-derived secret names.
    ///
    /// Blank prefixes fall back to [`DEFAULT_SECRET_PREFIX`].
    #[must_use]
    pub fn with_secret_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix_value = prefix.into();
        self.secret_prefix = Some(prefix_value).filter(|value| !value.trim().is_empty());
        self
    }

    /// Start describing a mount of this configuration at `path`.
    #[must_use]
    pub fn secret_mount(&self, path: impl Into<String>) -> SecretMount {
        SecretMount::new(self.clone(), path)
    }

    /// Return the prefix used for content-derived secret names.
    #[must_use]
    pub fn secret_prefix(&self) -> &str {
        self.secret_prefix
            .as_deref()
            .unwrap_or(DEFAULT_SECRET_PREFIX)
    }

    /// Return the accumulated credentials in insertion order.
    #[must_use]
    pub fn auths(&self) -> &[RegistryAuth] {
        &self.auths
    }

    /// Return the configured addresses, sorted.
    #[must_use]
    pub fn addresses(&self) -> Vec<&str> {
        let mut addresses: Vec<&str> = self.auths.iter().map(RegistryAuth::address).collect();
        addresses.sort_unstable();
        addresses
    }

    /// Return the number of credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.auths.len()
    }

    /// Return whether no credentials have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auths.is_empty()
    }
}
