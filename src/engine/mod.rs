//! Container engine connection and container runs.
//!
//! The engine endpoint is resolved through a priority-based fallback chain:
//!
//! 1. CLI argument (`--engine-socket`)
//! 2. Config file (`engine_socket` in TOML)
//! 3. `REGCONFIG_ENGINE_SOCKET` environment variable
//! 4. `DOCKER_HOST` environment variable
//! 5. `CONTAINER_HOST` environment variable
//! 6. `PODMAN_HOST` environment variable
//! 7. Platform default (`/var/run/docker.sock` on Unix)
//!
//! Steps 1 to 3 are merged by the configuration loader; [`SocketResolver`]
//! covers the rest.

mod connection;

pub use connection::{ContainerEngine, ContainerRun, EngineConnector, EngineFuture, SocketResolver};
