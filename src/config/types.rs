//! Configuration data types for regconfig.

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};

use crate::container::DEFAULT_SECRET_MODE;
use crate::error::{ConfigError, RegconfigError};
use crate::registry::{DEFAULT_SECRET_PREFIX, RegistryConfig, SecretMount};
use crate::secret::SecretRef;

/// Container path the registry configuration is mounted at by default.
pub const DEFAULT_MOUNT_PATH: &str = "/root/.docker/config.json";

/// Secret naming configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecretConfig {
    /// Prefix of content-derived secret names.
    pub name_prefix: String,

    /// Fixed secret name; overrides the content-derived name.
    pub name: Option<String>,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            name_prefix: String::from(DEFAULT_SECRET_PREFIX),
            name: None,
        }
    }
}

/// Where and how the configuration file lands in the container.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MountConfig {
    /// Absolute container path of the mounted file.
    pub path: String,

    /// Leave containers untouched when no registry is configured.
    pub skip_on_empty: bool,

    /// Permission bits of the mounted file.
    pub mode: u32,

    /// Owner as `user` or `user:group`.
    pub owner: Option<String>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            path: String::from(DEFAULT_MOUNT_PATH),
            skip_on_empty: false,
            mode: DEFAULT_SECRET_MODE,
            owner: None,
        }
    }
}

/// One `[[registries]]` table.
///
/// Exactly one of `password`, `password_env`, and `password_file` must be set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryEntry {
    /// Registry host, for example `ghcr.io`.
    pub address: String,

    /// Account name.
    pub username: String,

    /// Literal password or token.
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// File holding the password.
    pub password_file: Option<Utf8PathBuf>,
}

impl RegistryEntry {
    /// Build the secret reference for this entry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` unless exactly one password source
    /// is set.
    pub fn secret_ref(&self) -> Result<SecretRef, RegconfigError> {
        let sources = [
            self.password.clone().map(SecretRef::plaintext),
            self.password_env.clone().map(SecretRef::env),
            self.password_file.clone().map(SecretRef::file),
        ];
        let mut configured = sources.into_iter().flatten();

        match (configured.next(), configured.next()) {
            (Some(secret), None) => Ok(secret),
            (None, _) => Err(self.invalid_source("no password source set")),
            (Some(_), Some(_)) => Err(self.invalid_source("more than one password source set")),
        }
    }

    fn invalid_source(&self, reason: &str) -> RegconfigError {
        RegconfigError::from(ConfigError::InvalidValue {
            field: format!("registries.{}", self.address),
            reason: format!(
                "{reason}; use one of password, password_env, or password_file"
            ),
        })
    }
}

/// Root application configuration.
///
/// This structure is loaded from configuration files, environment variables,
/// and command-line arguments with layered precedence. The precedence order
/// (lowest to highest) is: defaults, configuration file, environment variables,
/// command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `REGCONFIG_CONFIG_PATH` environment variable
/// 2. `.regconfig.toml` in the current working directory
/// 3. `.regconfig.toml` in the home directory
/// 4. `~/.config/regconfig/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "REGCONFIG",
    post_merge_hook,
    discovery(
        app_name = "regconfig",
        env_var = "REGCONFIG_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".regconfig.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The container engine socket path or URL.
    pub engine_socket: Option<String>,

    /// The image `run` creates containers from.
    pub image: Option<String>,

    /// Secret naming configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub secret: SecretConfig,

    /// Mount configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub mount: MountConfig,

    /// Registry credentials, in file order.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub registries: Vec<RegistryEntry>,
}

impl AppConfig {
    /// Build the registry accumulator described by `[[registries]]`.
    ///
    /// Later entries for the same address replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when an entry does not name exactly
    /// one password source.
    pub fn registry_config(&self) -> Result<RegistryConfig, RegconfigError> {
        self.registries.iter().try_fold(
            RegistryConfig::new().with_secret_prefix(self.secret.name_prefix.clone()),
            |config, entry| {
                Ok(config.with_registry_auth(
                    entry.address.clone(),
                    entry.username.clone(),
                    entry.secret_ref()?,
                ))
            },
        )
    }

    /// Build the mount described by `[mount]` and `[secret]`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::registry_config`].
    pub fn secret_mount(&self) -> Result<SecretMount, RegconfigError> {
        let mut mount = self
            .registry_config()?
            .secret_mount(self.mount.path.clone())
            .with_skip_on_empty(self.mount.skip_on_empty)
            .with_mode(self.mount.mode);
        if let Some(owner) = self.mount.owner.clone() {
            mount = mount.with_owner(owner);
        }
        if let Some(name) = self.secret.name.clone() {
            mount = mount.with_secret_name(name);
        }
        Ok(mount)
    }
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // Blank strings from any layer mean "unset".
        for value in [&mut self.engine_socket, &mut self.image, &mut self.secret.name] {
            if value.as_deref().is_some_and(|text| text.trim().is_empty()) {
                *value = None;
            }
        }
        Ok(())
    }
}
