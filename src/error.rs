//! Semantic error types for regconfig.
//!
//! Conditions a caller might inspect or map (an empty registry address, a
//! secret that cannot be resolved, an engine that refuses a container) are
//! semantic enums built with `thiserror`. Opaque reports (`eyre::Report`) are
//! reserved for the binary boundary.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while validating an accumulated registry configuration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A registry entry was added with an empty or whitespace-only address.
    #[error("registry address must not be empty (username '{username}')")]
    EmptyAddress {
        /// The username attached to the offending entry.
        username: String,
    },

    /// A username contains `:`, which would make the encoded token ambiguous.
    #[error("username '{username}' for registry '{address}' must not contain ':'")]
    InvalidUsername {
        /// The registry address of the offending entry.
        address: String,
        /// The rejected username.
        username: String,
    },
}

/// Errors that can occur while resolving or registering secrets.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The secret for a registry entry could not be resolved to plaintext.
    #[error("failed to resolve secret for registry '{address}': {message}")]
    ResolutionFailed {
        /// The registry address whose secret failed to resolve.
        address: String,
        /// A description of the underlying failure.
        message: String,
    },

    /// A secret was sourced from an environment variable that is unset or empty.
    #[error("environment variable '{name}' is not set")]
    EnvNotSet {
        /// The environment variable name.
        name: String,
    },

    /// A secret file could not be read.
    #[error("failed to read secret file '{path}': {message}")]
    ReadFailed {
        /// The path of the secret file.
        path: PathBuf,
        /// A description of the read failure.
        message: String,
    },

    /// A secret value was not valid UTF-8.
    #[error("secret '{source_name}' is not valid UTF-8")]
    InvalidUtf8 {
        /// A human-readable name for the secret source.
        source_name: String,
    },

    /// Resolved credentials could not be serialised.
    #[error("failed to serialise registry configuration: {message}")]
    SerializationFailed {
        /// A description of the serialisation failure.
        message: String,
    },

    /// The secret store rejected a registration.
    #[error("failed to register secret '{name}': {message}")]
    RegistrationFailed {
        /// The name the secret was registered under.
        name: String,
        /// A description of the registration failure.
        message: String,
    },
}

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found at the expected path.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path where the configuration file was expected.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A required configuration value is missing.
    #[error("missing required configuration: {field}")]
    MissingRequired {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during layer merging.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors that can occur during container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Failed to connect to the container engine socket.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// A description of the connection failure.
        message: String,
    },

    /// The container engine socket was not found.
    #[error("container engine socket not found: {path}")]
    SocketNotFound {
        /// The path where the socket was expected.
        path: PathBuf,
    },

    /// Permission denied when accessing the container engine socket.
    #[error("permission denied accessing container socket: {path}")]
    PermissionDenied {
        /// The path to the socket.
        path: PathBuf,
    },

    /// Failed to create a container.
    #[error("failed to create container: {message}")]
    CreateFailed {
        /// A description of the creation failure.
        message: String,
    },

    /// Failed to start a container.
    #[error("failed to start container '{container_id}': {message}")]
    StartFailed {
        /// The ID of the container that failed to start.
        container_id: String,
        /// A description of the start failure.
        message: String,
    },

    /// Failed to upload files to a container.
    #[error("failed to upload files to container '{container_id}': {message}")]
    UploadFailed {
        /// The ID of the target container.
        container_id: String,
        /// A description of the upload failure.
        message: String,
    },

    /// Health check failed - engine did not respond correctly.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// A description of the health check failure.
        message: String,
    },

    /// Health check timed out.
    #[error("container engine health check timed out after {seconds} seconds")]
    HealthCheckTimeout {
        /// The timeout duration in seconds.
        seconds: u64,
    },

    /// A Tokio runtime could not be created for a synchronous wrapper.
    #[error("failed to create async runtime: {message}")]
    RuntimeCreationFailed {
        /// A description of the runtime failure.
        message: String,
    },
}

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// An I/O error occurred.
    #[error("I/O error at '{path}': {message}")]
    IoError {
        /// The path where the error occurred.
        path: PathBuf,
        /// A description of the I/O error.
        message: String,
    },
}

/// Top-level error type for regconfig.
///
/// Aggregates every domain error so library callers can match on a single
/// type. The binary converts these into `eyre::Report` at the boundary.
#[derive(Debug, Error)]
pub enum RegconfigError {
    /// The accumulated registry configuration is invalid.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A secret could not be resolved or registered.
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred during container operations.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// An error occurred during filesystem operations.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// A specialised `Result` type for regconfig operations.
pub type Result<T> = std::result::Result<T, RegconfigError>;
