//! Socket resolution and container engine connection.
//!
//! Resolves the engine endpoint from configuration, environment variables, or
//! the platform default, and connects to it with `Bollard`.

mod error_classification;
mod run_container;

use std::time::Duration;

use bollard::Docker;
use tracing::debug;

use crate::error::{ContainerError, RegconfigError};
use error_classification::classify_connection_error;

pub use run_container::{ContainerEngine, ContainerRun, EngineFuture};

/// Environment variable names checked in fallback order after configuration sources.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Connection timeout in seconds for Docker/Podman API connections.
const CONNECTION_TIMEOUT_SECS: u64 = 120;

/// Timeout in seconds for health check operations.
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

#[cfg(unix)]
const DEFAULT_SOCKET: &str = "unix:///var/run/docker.sock";

#[cfg(windows)]
const DEFAULT_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// Resolves container engine socket endpoints from environment variables.
///
/// # Type Parameters
///
/// * `E` - An environment provider implementing `mockable::Env`.
pub struct SocketResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> SocketResolver<'a, E> {
    /// Creates a new socket resolver with the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// Returns the first non-empty value of `DOCKER_HOST`, `CONTAINER_HOST`,
    /// or `PODMAN_HOST`, in that order.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.is_empty())
    }

    /// Returns the platform default socket.
    #[must_use]
    pub const fn default_socket() -> &'static str {
        DEFAULT_SOCKET
    }
}

/// How an endpoint string should be handed to `Bollard`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    /// `unix://` or `npipe://` URI, used as-is.
    Socket(String),
    /// HTTP-compatible URI; `tcp://` is rewritten to `http://`.
    Http(String),
}

impl Endpoint {
    fn parse(socket: &str) -> Self {
        if socket.starts_with("unix://") || socket.starts_with("npipe://") {
            return Self::Socket(String::from(socket));
        }
        if let Some(rest) = socket.strip_prefix("tcp://") {
            return Self::Http(format!("http://{rest}"));
        }
        if socket.starts_with("http://") || socket.starts_with("https://") {
            return Self::Http(String::from(socket));
        }
        // Bare paths: `\\` or `//` prefixes are named pipes, anything else is a
        // Unix socket. Detection is syntactic, not per platform.
        if socket.starts_with("\\\\") || socket.starts_with("//") {
            Self::Socket(format!("npipe://{socket}"))
        } else {
            Self::Socket(format!("unix://{socket}"))
        }
    }

    fn uri(&self) -> &str {
        match self {
            Self::Socket(uri) | Self::Http(uri) => uri,
        }
    }
}

/// Connects to Docker or Podman engines and drives container runs.
pub struct EngineConnector;

impl EngineConnector {
    /// Connect to the container engine at `socket`.
    ///
    /// Accepts `unix://`, `npipe://`, `tcp://` (treated as HTTP), `http://`,
    /// `https://`, and bare socket paths.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::SocketNotFound` or
    /// `ContainerError::PermissionDenied` when the socket path is the problem,
    /// and `ContainerError::ConnectionFailed` otherwise.
    pub fn connect(socket: &str) -> Result<Docker, RegconfigError> {
        let endpoint = Endpoint::parse(socket);
        debug!(endpoint = endpoint.uri(), "connecting to container engine");

        let connected = match &endpoint {
            Endpoint::Socket(uri) => Docker::connect_with_socket(
                uri,
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            Endpoint::Http(uri) => Docker::connect_with_http(
                uri,
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
        };

        connected.map_err(|error| {
            RegconfigError::from(classify_connection_error(&error, endpoint.uri()))
        })
    }

    /// Resolve the endpoint without connecting.
    ///
    /// Resolution order: `config_socket` when non-empty, then the fallback
    /// environment variables, then the platform default.
    #[must_use]
    pub fn resolve_socket<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> String {
        config_socket
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or_else(|| resolver.resolve_from_env())
            .unwrap_or_else(|| SocketResolver::<E>::default_socket().to_owned())
    }

    /// Connect using the resolved endpoint.
    ///
    /// # Errors
    ///
    /// See [`Self::connect`].
    pub fn connect_with_fallback<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, RegconfigError> {
        Self::connect(&Self::resolve_socket(config_socket, resolver))
    }

    /// Verify the engine answers a ping within ten seconds (async version).
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HealthCheckTimeout` when the ping times out and
    /// `ContainerError::HealthCheckFailed` when the engine answers with an
    /// error.
    pub async fn health_check_async(docker: &Docker) -> Result<(), RegconfigError> {
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

        tokio::time::timeout(timeout, docker.ping())
            .await
            .map_err(|_| ContainerError::HealthCheckTimeout {
                seconds: HEALTH_CHECK_TIMEOUT_SECS,
            })?
            .map_err(|error| ContainerError::HealthCheckFailed {
                message: error.to_string(),
            })?;
        Ok(())
    }

    /// Verify the engine answers a ping within ten seconds.
    ///
    /// Creates a dedicated Tokio runtime; prefer
    /// [`Self::health_check_async`] inside async code.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RuntimeCreationFailed` when no runtime can be
    /// created, plus the errors of [`Self::health_check_async`].
    pub fn health_check(docker: &Docker) -> Result<(), RegconfigError> {
        Self::create_runtime()?.block_on(Self::health_check_async(docker))
    }

    /// Create a Tokio runtime for synchronous entry points.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RuntimeCreationFailed` when the runtime cannot
    /// be built.
    pub fn create_runtime() -> Result<tokio::runtime::Runtime, RegconfigError> {
        tokio::runtime::Runtime::new().map_err(|error| {
            RegconfigError::from(ContainerError::RuntimeCreationFailed {
                message: error.to_string(),
            })
        })
    }
}
