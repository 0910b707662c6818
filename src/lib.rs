//! Container registry credentials as a Docker `config.json` secret.
//!
//! `regconfig` accumulates registry credentials as plain values, materializes
//! them into the canonical Docker client configuration document, registers the
//! document as a named secret, and mounts it into containers before they
//! start. Credential values stay behind references (literal, environment
//! variable, file, or an existing secret) until materialization, and are never
//! logged.
//!
//! # Modules
//!
//! - [`registry`]: the registry-credential accumulator and its materializer
//! - [`secret`]: secret references, resolution, and storage
//! - [`container`]: container definitions that carry mounted secrets
//! - [`engine`]: Docker/Podman connection and container runs
//! - [`args`]: argv assembly for tools wrapped inside containers
//! - [`config`]: layered configuration (CLI > env > file > defaults)
//! - [`error`]: semantic error types

pub mod args;
pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod registry;
pub mod secret;
