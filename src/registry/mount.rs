//! Mounting a materialized registry configuration into a container.

use tracing::debug;

use super::RegistryConfig;
use crate::container::{ContainerSpec, SecretMountOptions};
use crate::error::RegconfigError;
use crate::secret::{SecretResolver, SecretStore};

/// A pending mount of a [`RegistryConfig`] at a container path.
#[derive(Debug, Clone)]
pub struct SecretMount {
    config: RegistryConfig,
    path: String,
    secret_name: Option<String>,
    skip_on_empty: bool,
    options: SecretMountOptions,
}

impl SecretMount {
    pub(super) fn new(config: RegistryConfig, path: impl Into<String>) -> Self {
        Self {
            config,
            path: path.into(),
            secret_name: None,
            skip_on_empty: false,
            options: SecretMountOptions::default(),
        }
    }

    /// Register the secret under `name` instead of a content-derived name.
    #[must_use]
    pub fn with_secret_name(mut self, name: impl Into<String>) -> Self {
        let name_value = name.into();
        self.secret_name = Some(name_value).filter(|value| !value.is_empty());
        self
    }

    /// Leave the container untouched when the configuration has no entries.
    #[must_use]
    pub const fn with_skip_on_empty(mut self, skip_on_empty: bool) -> Self {
        self.skip_on_empty = skip_on_empty;
        self
    }

    /// Set the owner of the mounted file.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.options.owner = Some(owner.into());
        self
    }

    /// Set the permission bits of the mounted file.
    #[must_use]
    pub const fn with_mode(mut self, mode: u32) -> Self {
        self.options.mode = mode;
        self
    }

    /// Return the container path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Materialize the configuration and mount it into `container` (async
    /// version).
    ///
    /// # Errors
    ///
    /// Returns the errors of [`RegistryConfig::secret_async`].
    pub async fn mount_async<R, S>(
        &self,
        resolver: &R,
        store: &S,
        container: ContainerSpec,
    ) -> Result<ContainerSpec, RegconfigError>
    where
        R: SecretResolver + ?Sized,
        S: SecretStore + ?Sized,
    {
        if self.skip_on_empty && self.config.is_empty() {
            debug!(path = %self.path, "no registry credentials; skipping mount");
            return Ok(container);
        }

        let secret = self
            .config
            .secret_async(resolver, store, self.secret_name.as_deref())
            .await?;

        Ok(container.with_mounted_secret(self.path.clone(), secret, self.options.clone()))
    }

    /// Materialize the configuration and mount it into `container`.
    ///
    /// This synchronous helper blocks on [`Self::mount_async`] using a
    /// caller-provided Tokio runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`RegistryConfig::secret_async`].
    pub fn mount<R, S>(
        &self,
        runtime: &tokio::runtime::Handle,
        resolver: &R,
        store: &S,
        container: ContainerSpec,
    ) -> Result<ContainerSpec, RegconfigError>
    where
        R: SecretResolver + ?Sized,
        S: SecretStore + ?Sized,
    {
        runtime.block_on(self.mount_async(resolver, store, container))
    }
}
