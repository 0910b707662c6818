//! Running a [`ContainerSpec`] on a container engine.
//!
//! A run is three engine calls: create the container, upload every mounted
//! secret as one tar archive rooted at `/`, then start it. Secrets are placed
//! before the entrypoint runs, so nothing in the container can observe a
//! half-written configuration file.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse};
use bollard::query_parameters::{
    CreateContainerOptions, CreateContainerOptionsBuilder, UploadToContainerOptions,
    UploadToContainerOptionsBuilder,
};
use camino::{Utf8Component, Utf8Path};
use tracing::{debug, info};

mod archive;

use super::EngineConnector;
use crate::container::ContainerSpec;
use crate::error::{ConfigError, ContainerError, FilesystemError, RegconfigError};
use archive::build_secret_archive;

const ARCHIVE_ROOT: &str = "/";

/// Boxed future type returned by [`ContainerEngine`] implementors.
pub type EngineFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, bollard::errors::Error>> + Send + 'a>>;

/// Behaviour required to create, populate, and start containers.
///
/// This abstraction keeps run logic testable without a live daemon.
pub trait ContainerEngine {
    /// Create a container from `Bollard` options and body payload.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> EngineFuture<'_, ContainerCreateResponse>;

    /// Upload a tar archive payload into `container_id`.
    fn upload_to_container(
        &self,
        container_id: &str,
        options: Option<UploadToContainerOptions>,
        archive_bytes: Vec<u8>,
    ) -> EngineFuture<'_, ()>;

    /// Start a created container.
    fn start_container(&self, container_id: &str) -> EngineFuture<'_, ()>;
}

impl ContainerEngine for Docker {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> EngineFuture<'_, ContainerCreateResponse> {
        Box::pin(async move { Self::create_container(self, options, config).await })
    }

    fn upload_to_container(
        &self,
        container_id: &str,
        options: Option<UploadToContainerOptions>,
        archive_bytes: Vec<u8>,
    ) -> EngineFuture<'_, ()> {
        let container_id_owned = String::from(container_id);

        Box::pin(async move {
            Self::upload_to_container(
                self,
                &container_id_owned,
                options,
                bollard::body_full(archive_bytes.into()),
            )
            .await
        })
    }

    fn start_container(&self, container_id: &str) -> EngineFuture<'_, ()> {
        let container_id_owned = String::from(container_id);

        Box::pin(async move {
            Self::start_container(
                self,
                &container_id_owned,
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
        })
    }
}

/// Outcome of a container run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRun {
    container_id: String,
    secret_paths: Vec<String>,
}

impl ContainerRun {
    /// Return the engine-assigned container identifier.
    #[must_use]
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Return the container paths that received secrets, in mount order.
    #[must_use]
    pub fn secret_paths(&self) -> &[String] {
        &self.secret_paths
    }
}

impl EngineConnector {
    /// Create, populate, and start a container (async version).
    ///
    /// Mount paths are validated before the engine is contacted. When the container spec
    /// carries no secrets, the upload step is skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a relative mount path or one
    /// containing `..`, `FilesystemError::IoError` when the archive cannot be
    /// built, and `ContainerError::{CreateFailed, UploadFailed, StartFailed}`
    /// when the matching engine call fails.
    pub async fn run_async<C: ContainerEngine + ?Sized>(
        engine: &C,
        spec: &ContainerSpec,
    ) -> Result<ContainerRun, RegconfigError> {
        let secret_paths = spec
            .secrets()
            .iter()
            .map(|mounted| validate_mount_path(mounted.path()).map(String::from))
            .collect::<Result<Vec<_>, _>>()?;

        let archive_bytes = if secret_paths.is_empty() {
            None
        } else {
            let bytes = build_secret_archive(spec.secrets()).map_err(|error| {
                RegconfigError::from(FilesystemError::IoError {
                    path: ARCHIVE_ROOT.into(),
                    message: error.to_string(),
                })
            })?;
            Some(bytes)
        };

        let response = engine
            .create_container(build_create_options(spec.name()), build_create_body(spec))
            .await
            .map_err(|error| {
                RegconfigError::from(ContainerError::CreateFailed {
                    message: error.to_string(),
                })
            })?;
        let container_id = response.id;
        debug!(container = %container_id, image = spec.image(), "container created");

        if let Some(bytes) = archive_bytes {
            engine
                .upload_to_container(&container_id, Some(build_upload_options()), bytes)
                .await
                .map_err(|error| {
                    RegconfigError::from(ContainerError::UploadFailed {
                        container_id: container_id.clone(),
                        message: error.to_string(),
                    })
                })?;
            debug!(container = %container_id, paths = ?secret_paths, "secrets uploaded");
        }

        engine
            .start_container(&container_id)
            .await
            .map_err(|error| {
                RegconfigError::from(ContainerError::StartFailed {
                    container_id: container_id.clone(),
                    message: error.to_string(),
                })
            })?;
        info!(container = %container_id, image = spec.image(), "container started");

        Ok(ContainerRun {
            container_id,
            secret_paths,
        })
    }

    /// Create, populate, and start a container.
    ///
    /// This synchronous helper blocks on [`Self::run_async`] using a
    /// caller-provided Tokio runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::run_async`].
    pub fn run<C: ContainerEngine + ?Sized>(
        runtime: &tokio::runtime::Handle,
        engine: &C,
        spec: &ContainerSpec,
    ) -> Result<ContainerRun, RegconfigError> {
        runtime.block_on(Self::run_async(engine, spec))
    }
}

/// Accept absolute, normalized paths that name a file below `/`.
fn validate_mount_path(path: &str) -> Result<&str, RegconfigError> {
    let candidate = Utf8Path::new(path);
    let reason = if !path.starts_with('/') {
        Some("mount path must be absolute")
    } else if candidate
        .components()
        .any(|component| matches!(component, Utf8Component::ParentDir))
    {
        Some("mount path must not contain '..'")
    } else if candidate.file_name().is_none() {
        Some("mount path must name a file")
    } else {
        None
    };

    reason.map_or(Ok(path), |message| {
        Err(RegconfigError::from(ConfigError::InvalidValue {
            field: String::from("mount.path"),
            reason: format!("{message}: {path}"),
        }))
    })
}

fn build_create_options(name: Option<&str>) -> Option<CreateContainerOptions> {
    name.map(|container_name| {
        CreateContainerOptionsBuilder::new()
            .name(container_name)
            .build()
    })
}

fn build_create_body(spec: &ContainerSpec) -> ContainerCreateBody {
    let env = spec.env_list();

    ContainerCreateBody {
        image: Some(String::from(spec.image())),
        cmd: spec.exec().map(<[String]>::to_vec),
        env: (!env.is_empty()).then_some(env),
        working_dir: spec.workdir().map(String::from),
        user: spec.user().map(String::from),
        ..ContainerCreateBody::default()
    }
}

fn build_upload_options() -> UploadToContainerOptions {
    UploadToContainerOptionsBuilder::default()
        .path(ARCHIVE_ROOT)
        .build()
}
