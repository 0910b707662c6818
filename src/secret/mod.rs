//! Secret references, resolution, and registration.
//!
//! Registry credentials never travel as bare strings. Callers describe where
//! a secret lives with a [`SecretRef`], a [`SecretResolver`] turns that
//! reference into plaintext only at materialization time, and a
//! [`SecretStore`] registers the materialized bytes under a name, returning a
//! [`SecretHandle`].
//!
//! Both collaborators are traits so materialization can be exercised without
//! a live engine. [`HostSecretResolver`] and [`MemorySecretStore`] are the
//! in-process implementations used by the CLI.

mod resolver;
mod store;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use camino::Utf8PathBuf;
use secrecy::{ExposeSecret, SecretBox, SecretString};
use sha1::{Digest, Sha1};

use crate::error::SecretError;

pub use resolver::HostSecretResolver;
pub use store::MemorySecretStore;

/// A boxed future for async trait methods.
///
/// This type alias keeps [`SecretResolver`] object-safe and compatible with
/// `mockall`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where the plaintext of a secret can be obtained.
#[derive(Clone)]
pub enum SecretRef {
    /// The value is supplied inline.
    Plaintext(SecretString),

    /// The value is read from a host environment variable.
    Env(String),

    /// The value is read from a host file. One trailing newline is trimmed.
    File(Utf8PathBuf),

    /// The value of a secret that was already registered with a store.
    Handle(SecretHandle),
}

impl SecretRef {
    /// Build an inline secret reference.
    #[must_use]
    pub fn plaintext(value: impl Into<String>) -> Self {
        Self::Plaintext(SecretString::from(value.into()))
    }

    /// Build a reference to a host environment variable.
    #[must_use]
    pub fn env(name: impl Into<String>) -> Self {
        Self::Env(name.into())
    }

    /// Build a reference to a host file.
    #[must_use]
    pub fn file(path: impl Into<Utf8PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// A short description of the reference that never contains plaintext.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Plaintext(_) => String::from("plaintext"),
            Self::Env(name) => format!("env:{name}"),
            Self::File(path) => format!("file:{path}"),
            Self::Handle(handle) => format!("secret:{}", handle.name()),
        }
    }
}

impl fmt::Debug for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretRef").field(&self.describe()).finish()
    }
}

impl From<SecretHandle> for SecretRef {
    fn from(handle: SecretHandle) -> Self {
        Self::Handle(handle)
    }
}

/// A secret registered with a [`SecretStore`].
///
/// The handle is cheap to clone. Its contents are reachable only through
/// [`SecretHandle::expose_secret`] and are redacted from `Debug` output.
#[derive(Clone)]
pub struct SecretHandle {
    name: String,
    contents: Arc<SecretBox<[u8]>>,
}

impl SecretHandle {
    /// Create a handle for `contents` registered as `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            contents: Arc::new(SecretBox::new(contents.into_boxed_slice())),
        }
    }

    /// Return the name the secret is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reveal the secret bytes.
    #[must_use]
    pub fn expose_secret(&self) -> &[u8] {
        self.contents.expose_secret()
    }
}

impl fmt::Debug for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHandle")
            .field("name", &self.name)
            .field("contents", &"[REDACTED]")
            .finish()
    }
}

/// Behaviour required to turn a [`SecretRef`] into plaintext.
///
/// This is the only fallible, suspending step of materialization.
#[cfg_attr(test, mockall::automock)]
pub trait SecretResolver: Send + Sync {
    /// Resolve `secret` to its plaintext value.
    ///
    /// # Errors
    ///
    /// Returns a [`SecretError`] describing why the value is unavailable.
    fn resolve(&self, secret: &SecretRef) -> BoxFuture<'_, Result<SecretString, SecretError>>;
}

/// Behaviour required to register materialized secret bytes under a name.
///
/// Engines usually keep one process-wide secret namespace, so registering an
/// existing name replaces the previous value.
#[cfg_attr(test, mockall::automock)]
pub trait SecretStore: Send + Sync {
    /// Register `contents` as `name` and return its handle.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::RegistrationFailed`] when the store rejects the
    /// secret.
    fn register(&self, name: &str, contents: Vec<u8>) -> Result<SecretHandle, SecretError>;
}

/// Compute the content-derived secret name `"<prefix>-<sha1 hex>"`.
///
/// The digest is lowercase hexadecimal, so byte-identical input always maps to
/// the same name.
///
/// # Examples
///
/// ```
/// use regconfig::secret::content_derived_name;
///
/// assert_eq!(
///     content_derived_name("registry-config", b"{}"),
///     "registry-config-bf21a9e8fbc5a3846fb05b4fa0859e0917b2202f",
/// );
/// ```
#[must_use]
pub fn content_derived_name(prefix: &str, contents: &[u8]) -> String {
    let digest = Sha1::digest(contents);
    format!("{prefix}-{}", hex::encode(digest))
}
