//! Host-side secret resolution.

use std::future;
use std::path::PathBuf;

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use secrecy::SecretString;

use super::{BoxFuture, SecretRef, SecretResolver};
use crate::error::SecretError;

/// Resolves secret references against the host environment and filesystem.
///
/// # Type Parameters
///
/// * `E` - An environment provider implementing `mockable::Env`, so tests can
///   inject variables without touching the process environment.
///
/// # Example
///
/// ```ignore
/// use mockable::DefaultEnv;
/// use regconfig::secret::{HostSecretResolver, SecretRef};
///
/// let resolver = HostSecretResolver::new(DefaultEnv::new());
/// let token = resolver.resolve_now(&SecretRef::env("GHCR_TOKEN"))?;
/// ```
pub struct HostSecretResolver<E> {
    env: E,
}

impl<E: mockable::Env + Send + Sync> HostSecretResolver<E> {
    /// Create a resolver backed by `env`.
    #[must_use]
    pub const fn new(env: E) -> Self {
        Self { env }
    }

    /// Resolve `secret` synchronously.
    ///
    /// Environment and file lookups never suspend, so the async trait method
    /// delegates here and returns a ready future.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::EnvNotSet`] for unset or empty variables,
    /// [`SecretError::ReadFailed`] for unreadable files, and
    /// [`SecretError::InvalidUtf8`] for registered secrets that are not text.
    pub fn resolve_now(&self, secret: &SecretRef) -> Result<SecretString, SecretError> {
        match secret {
            SecretRef::Plaintext(value) => Ok(value.clone()),
            SecretRef::Env(name) => self.resolve_env(name),
            SecretRef::File(path) => read_secret_file(path),
            SecretRef::Handle(handle) => std::str::from_utf8(handle.expose_secret())
                .map(SecretString::from)
                .map_err(|_| SecretError::InvalidUtf8 {
                    source_name: secret.describe(),
                }),
        }
    }

    fn resolve_env(&self, name: &str) -> Result<SecretString, SecretError> {
        self.env
            .string(name)
            .filter(|value| !value.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| SecretError::EnvNotSet {
                name: String::from(name),
            })
    }
}

impl<E: mockable::Env + Send + Sync> SecretResolver for HostSecretResolver<E> {
    fn resolve(&self, secret: &SecretRef) -> BoxFuture<'_, Result<SecretString, SecretError>> {
        Box::pin(future::ready(self.resolve_now(secret)))
    }
}

fn read_secret_file(path: &Utf8Path) -> Result<SecretString, SecretError> {
    let read_failed = |message: String| SecretError::ReadFailed {
        path: PathBuf::from(path.as_std_path()),
        message,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| read_failed(String::from("path does not contain a filename")))?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|error| read_failed(format!("failed to open parent directory: {error}")))?;
    let contents = dir
        .read_to_string(file_name)
        .map_err(|error| read_failed(error.to_string()))?;

    Ok(SecretString::from(trim_one_newline(contents)))
}

/// Drop a single trailing `\n` or `\r\n`, as written by most editors.
pub(super) fn trim_one_newline(mut contents: String) -> String {
    if contents.ends_with('\n') {
        contents.pop();
        if contents.ends_with('\r') {
            contents.pop();
        }
    }
    contents
}

impl<E> std::fmt::Debug for HostSecretResolver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSecretResolver").finish_non_exhaustive()
    }
}

