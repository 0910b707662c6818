//! Container definitions assembled before they reach an engine.
//!
//! A [`ContainerSpec`] is a plain value: base image, environment, exec
//! arguments, and mounted secrets. Builders consume and return the value, so a
//! partially configured definition can be cloned and extended independently. The
//! engine module turns a finished definition into a running container.

use std::collections::BTreeMap;

use crate::error::{ConfigError, RegconfigError};
use crate::secret::SecretHandle;

/// Mode applied to mounted secrets unless overridden (`0o400`).
pub const DEFAULT_SECRET_MODE: u32 = 0o400;

/// Ownership and permissions of a secret mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMountOptions {
    /// Owner as `user` or `user:group`; engine default when `None`.
    pub owner: Option<String>,

    /// Permission bits of the mounted file.
    pub mode: u32,
}

impl Default for SecretMountOptions {
    fn default() -> Self {
        Self {
            owner: None,
            mode: DEFAULT_SECRET_MODE,
        }
    }
}

/// A secret placed at a path inside a container.
#[derive(Debug, Clone)]
pub struct MountedSecret {
    path: String,
    secret: SecretHandle,
    options: SecretMountOptions,
}

impl MountedSecret {
    /// Return the absolute path of the secret inside the container.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Return the mounted secret.
    #[must_use]
    pub const fn secret(&self) -> &SecretHandle {
        &self.secret
    }

    /// Return the ownership and permission options.
    #[must_use]
    pub const fn options(&self) -> &SecretMountOptions {
        &self.options
    }
}

/// Definition of a container to be created by an engine.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    image: String,
    name: Option<String>,
    env: BTreeMap<String, String>,
    workdir: Option<String>,
    user: Option<String>,
    exec: Option<Vec<String>>,
    secrets: Vec<MountedSecret>,
}

impl ContainerSpec {
    /// Create a spec for `image`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `image` is empty or
    /// whitespace-only.
    pub fn new(image: impl Into<String>) -> Result<Self, RegconfigError> {
        let image_value = image.into();
        let trimmed = image_value.trim();

        if trimmed.is_empty() {
            return Err(RegconfigError::from(ConfigError::MissingRequired {
                field: String::from("image"),
            }));
        }

        Ok(Self {
            image: String::from(trimmed),
            name: None,
            env: BTreeMap::new(),
            workdir: None,
            user: None,
            exec: None,
            secrets: Vec::new(),
        })
    }

    /// Attach an optional container name. Blank names are ignored.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|value| !value.trim().is_empty());
        self
    }

    /// Set an environment variable, replacing any earlier value.
    #[must_use]
    pub fn with_env_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Remove an environment variable.
    #[must_use]
    pub fn without_env_variable(mut self, key: &str) -> Self {
        self.env.remove(key);
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Set the user the process runs as.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the command to execute, replacing any earlier command.
    #[must_use]
    pub fn with_exec<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exec = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Mount `secret` at `path`, replacing any secret already at that path.
    #[must_use]
    pub fn with_mounted_secret(
        self,
        path: impl Into<String>,
        secret: SecretHandle,
        options: SecretMountOptions,
    ) -> Self {
        let path_value = path.into();
        let mut updated = self.without_mount(&path_value);
        updated.secrets.push(MountedSecret {
            path: path_value,
            secret,
            options,
        });
        updated
    }

    /// Remove whatever is mounted at `path`.
    #[must_use]
    pub fn without_mount(mut self, path: &str) -> Self {
        self.secrets.retain(|mounted| mounted.path != path);
        self
    }

    /// Return the image.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return the optional container name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Return the environment as a sorted map.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Return the environment as sorted `KEY=value` entries.
    #[must_use]
    pub fn env_list(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }

    /// Return the optional working directory.
    #[must_use]
    pub fn workdir(&self) -> Option<&str> {
        self.workdir.as_deref()
    }

    /// Return the optional user.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Return the optional command.
    #[must_use]
    pub fn exec(&self) -> Option<&[String]> {
        self.exec.as_deref()
    }

    /// Return the mounted secrets in mount order.
    #[must_use]
    pub fn secrets(&self) -> &[MountedSecret] {
        &self.secrets
    }
}
