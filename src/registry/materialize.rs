//! Rendering and registration of the accumulated configuration.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::debug;

use super::RegistryConfig;
use crate::error::{RegconfigError, RegistryError, SecretError};
use crate::secret::{SecretHandle, SecretResolver, SecretStore, content_derived_name};

/// Docker `config.json` layout. `BTreeMap` keeps addresses sorted.
#[derive(Serialize)]
struct DockerConfigFile<'a> {
    auths: BTreeMap<&'a str, AuthToken>,
}

#[derive(Serialize)]
struct AuthToken {
    auth: String,
}

impl RegistryConfig {
    /// Resolve every secret and render the canonical `config.json` bytes
    /// (async version).
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::EmptyAddress` or `RegistryError::InvalidUsername`
    /// before any resolution when an entry has a blank address or a username
    /// containing `:`, and `SecretError::ResolutionFailed` for the
    /// first secret that cannot be resolved.
    pub async fn render_async<R>(&self, resolver: &R) -> Result<Vec<u8>, RegconfigError>
    where
        R: SecretResolver + ?Sized,
    {
        self.validate()?;
        debug!(entries = self.len(), "rendering registry configuration");

        let mut auths = BTreeMap::new();
        for auth in self.auths() {
            let plaintext = resolver.resolve(auth.secret()).await.map_err(|error| {
                SecretError::ResolutionFailed {
                    address: String::from(auth.address()),
                    message: error.to_string(),
                }
            })?;

            let token = BASE64.encode(format!(
                "{}:{}",
                auth.username(),
                plaintext.expose_secret()
            ));
            auths.insert(auth.address(), AuthToken { auth: token });
        }

        serde_json::to_vec(&DockerConfigFile { auths }).map_err(|error| {
            RegconfigError::from(SecretError::SerializationFailed {
                message: error.to_string(),
            })
        })
    }

    /// Resolve every secret and render the canonical `config.json` bytes.
    ///
    /// This synchronous helper blocks on [`Self::render_async`] using a
    /// caller-provided Tokio runtime handle.
    ///
    /// # Errors
    ///
    /// See [`Self::render_async`].
    pub fn render<R>(
        &self,
        runtime: &tokio::runtime::Handle,
        resolver: &R,
    ) -> Result<Vec<u8>, RegconfigError>
    where
        R: SecretResolver + ?Sized,
    {
        runtime.block_on(self.render_async(resolver))
    }

    /// Materialize the configuration and register it as a secret (async
    /// version).
    ///
    /// When `name` is `None` or empty the secret is named
    /// `"<prefix>-<sha1 hex of the rendered bytes>"`; otherwise `name` is used
    /// verbatim. Nothing is registered when rendering fails.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::render_async`], and
    /// `SecretError::RegistrationFailed` when the store rejects the secret.
    pub async fn secret_async<R, S>(
        &self,
        resolver: &R,
        store: &S,
        name: Option<&str>,
    ) -> Result<SecretHandle, RegconfigError>
    where
        R: SecretResolver + ?Sized,
        S: SecretStore + ?Sized,
    {
        let contents = self.render_async(resolver).await?;
        let secret_name = name
            .filter(|value| !value.is_empty())
            .map_or_else(
                || content_derived_name(self.secret_prefix(), &contents),
                String::from,
            );

        let handle = store.register(&secret_name, contents)?;
        debug!(secret = %secret_name, "registered registry configuration");
        Ok(handle)
    }

    /// Materialize the configuration and register it as a secret.
    ///
    /// This synchronous helper blocks on [`Self::secret_async`] using a
    /// caller-provided Tokio runtime handle.
    ///
    /// # Errors
    ///
    /// See [`Self::secret_async`].
    pub fn secret<R, S>(
        &self,
        runtime: &tokio::runtime::Handle,
        resolver: &R,
        store: &S,
        name: Option<&str>,
    ) -> Result<SecretHandle, RegconfigError>
    where
        R: SecretResolver + ?Sized,
        S: SecretStore + ?Sized,
    {
        runtime.block_on(self.secret_async(resolver, store, name))
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if let Some(auth) = self
            .auths()
            .iter()
            .find(|auth| auth.address().trim().is_empty())
        {
            return Err(RegistryError::EmptyAddress {
                username: String::from(auth.username()),
            });
        }

        // `user:secret` is split on the first colon when decoded.
        self.auths()
            .iter()
            .find(|auth| auth.username().contains(':'))
            .map_or(Ok(()), |auth| {
                Err(RegistryError::InvalidUsername {
                    address: String::from(auth.address()),
                    username: String::from(auth.username()),
                })
            })
    }
}
