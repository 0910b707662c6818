//! Configuration system for regconfig.
//!
//! Configuration loading and precedence merging is handled by the
//! `ortho_config` crate. Precedence: CLI flags override environment variables,
//! which override configuration files, which override defaults.
//!
//! The configuration file is expected at `~/.config/regconfig/config.toml` by
//! default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///run/user/1000/podman/podman.sock"
//! image = "ghcr.io/acme/deployer:1.4"
//!
//! [secret]
//! name_prefix = "registry-config"
//!
//! [mount]
//! path = "/root/.docker/config.json"
//! mode = 0o400
//!
//! [[registries]]
//! address = "ghcr.io"
//! username = "octocat"
//! password_env = "GHCR_TOKEN"
//!
//! [[registries]]
//! address = "docker.io"
//! username = "octocat"
//! password_file = "/run/secrets/docker-hub"
//! ```

mod cli;
mod loader;
mod types;


pub use cli::{Cli, Commands, RunArgs};
pub use loader::{env_var_names, load_config};
pub use types::{AppConfig, DEFAULT_MOUNT_PATH, MountConfig, RegistryEntry, SecretConfig};
