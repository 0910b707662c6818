//! Given/when step definitions for registry-configuration scenarios.

use std::sync::{Arc, Mutex};

use bollard::models::{ContainerCreateBody, ContainerCreateResponse};
use bollard::query_parameters::{CreateContainerOptions, UploadToContainerOptions};
use mockable::MockEnv;
use mockall::mock;
use regconfig::container::ContainerSpec;
use regconfig::engine::{ContainerEngine, EngineConnector, EngineFuture};
use regconfig::error::{ConfigError, RegconfigError, RegistryError, SecretError};
use regconfig::secret::{HostSecretResolver, SecretRef};
use rstest_bdd_macros::{given, when};

use super::state::{FailureKind, RegistryConfigState, ScenarioOutcome, StepResult};

mock! {
    #[derive(Debug)]
    Engine {}

    impl ContainerEngine for Engine {
        fn create_container<'a>(
            &'a self,
            options: Option<CreateContainerOptions>,
            config: ContainerCreateBody,
        ) -> EngineFuture<'a, ContainerCreateResponse>;

        fn upload_to_container<'a>(
            &'a self,
            container_id: &str,
            options: Option<UploadToContainerOptions>,
            archive_bytes: Vec<u8>,
        ) -> EngineFuture<'a, ()>;

        fn start_container<'a>(&'a self, container_id: &str) -> EngineFuture<'a, ()>;
    }
}

/// Engine calls and the uploaded archive captured during a run.
#[derive(Default)]
struct EngineCapture {
    calls: Vec<String>,
    archive: Option<Vec<u8>>,
}

#[given("an empty registry configuration")]
fn an_empty_registry_configuration(registry_config_state: &RegistryConfigState) {
    registry_config_state
        .config
        .set(regconfig::registry::RegistryConfig::new());
}

#[given("registry \"{address}\" authenticates \"{username}\" with password \"{password}\"")]
fn registry_authenticates_with_password(
    registry_config_state: &RegistryConfigState,
    address: String,
    username: String,
    password: String,
) {
    add_registry(
        registry_config_state,
        address,
        username,
        SecretRef::plaintext(password),
    );
}

#[given(
    "registry \"{address}\" authenticates \"{username}\" with the environment variable \"{variable}\""
)]
fn registry_authenticates_with_env(
    registry_config_state: &RegistryConfigState,
    address: String,
    username: String,
    variable: String,
) {
    add_registry(
        registry_config_state,
        address,
        username,
        SecretRef::env(variable),
    );
}

#[given("a registry entry with a blank address")]
fn a_registry_entry_with_a_blank_address(registry_config_state: &RegistryConfigState) {
    add_registry(
        registry_config_state,
        String::new(),
        String::from("alice"),
        SecretRef::env("NEVER_READ"),
    );
}

#[given("the environment variable \"{variable}\" holds \"{value}\"")]
fn the_environment_variable_holds(
    registry_config_state: &RegistryConfigState,
    variable: String,
    value: String,
) {
    let mut env_vars = registry_config_state.env_vars.get().unwrap_or_default();
    env_vars.push((variable, value));
    registry_config_state.env_vars.set(env_vars);
}

#[given("the secret prefix is \"{prefix}\"")]
fn the_secret_prefix_is(registry_config_state: &RegistryConfigState, prefix: String) {
    let config = registry_config_state.config.get().unwrap_or_default();
    registry_config_state
        .config
        .set(config.with_secret_prefix(prefix));
}

#[given("the secret is named \"{name}\"")]
fn the_secret_is_named(registry_config_state: &RegistryConfigState, name: String) {
    registry_config_state.secret_name.set(name);
}

#[given("mounts skip empty configurations")]
fn mounts_skip_empty_configurations(registry_config_state: &RegistryConfigState) {
    registry_config_state.skip_on_empty.set(true);
}

#[when("the configuration is materialized")]
fn the_configuration_is_materialized(
    registry_config_state: &RegistryConfigState,
) -> StepResult<()> {
    let config = registry_config_state.config.get().unwrap_or_default();
    let store = registry_config_state
        .store
        .get()
        .ok_or_else(|| String::from("secret store should be initialised"))?;
    let resolver = resolver_for(registry_config_state);
    let secret_name = registry_config_state.secret_name.get();

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|error| format!("failed to create tokio runtime for scenario: {error}"))?;
    let result = runtime.block_on(config.secret_async(
        &resolver,
        store.as_ref(),
        secret_name.as_deref(),
    ));

    let outcome = match result {
        Ok(secret) => ScenarioOutcome::Materialized {
            document: secret.expose_secret().to_vec(),
            secret_name: String::from(secret.name()),
        },
        Err(error) => failure(&error, vec![]),
    };
    registry_config_state.outcome.set(outcome);
    Ok(())
}

#[when("the configuration is mounted at \"{path}\" and the container is run")]
fn the_configuration_is_mounted_and_run(
    registry_config_state: &RegistryConfigState,
    path: String,
) -> StepResult<()> {
    let config = registry_config_state.config.get().unwrap_or_default();
    let store = registry_config_state
        .store
        .get()
        .ok_or_else(|| String::from("secret store should be initialised"))?;
    let resolver = resolver_for(registry_config_state);
    let mount = config
        .secret_mount(path)
        .with_skip_on_empty(registry_config_state.skip_on_empty.get().unwrap_or(false));

    let capture = Arc::new(Mutex::new(EngineCapture::default()));
    let engine = recording_engine(&capture);
    let spec = ContainerSpec::new("alpine:3.20").map_err(|error| error.to_string())?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|error| format!("failed to create tokio runtime for scenario: {error}"))?;
    let result = runtime.block_on(async {
        let mounted = mount.mount_async(&resolver, store.as_ref(), spec).await?;
        EngineConnector::run_async(&engine, &mounted).await
    });

    let mut captured = capture
        .lock()
        .map_err(|_| String::from("engine capture mutex is poisoned"))?;
    let calls = std::mem::take(&mut captured.calls);
    let outcome = match result {
        Ok(_) => ScenarioOutcome::Ran {
            calls,
            archive: captured.archive.take(),
        },
        Err(error) => failure(&error, calls),
    };
    registry_config_state.outcome.set(outcome);
    Ok(())
}

fn add_registry(state: &RegistryConfigState, address: String, username: String, secret: SecretRef) {
    let config = state.config.get().unwrap_or_default();
    state
        .config
        .set(config.with_registry_auth(address, username, secret));
}

fn resolver_for(state: &RegistryConfigState) -> HostSecretResolver<MockEnv> {
    let env_vars = state.env_vars.get().unwrap_or_default();
    let mut env = MockEnv::new();
    env.expect_string().returning(move |key| {
        env_vars
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
    });
    HostSecretResolver::new(env)
}

fn recording_engine(capture: &Arc<Mutex<EngineCapture>>) -> MockEngine {
    let mut engine = MockEngine::new();

    let create_capture = Arc::clone(capture);
    engine.expect_create_container().returning(move |_, _| {
        if let Ok(mut locked) = create_capture.lock() {
            locked.calls.push(String::from("create"));
        }
        Box::pin(async {
            Ok(ContainerCreateResponse {
                id: String::from("container-bdd"),
                warnings: vec![],
            })
        })
    });

    let upload_capture = Arc::clone(capture);
    engine
        .expect_upload_to_container()
        .returning(move |_, _, archive_bytes| {
            if let Ok(mut locked) = upload_capture.lock() {
                locked.calls.push(String::from("upload"));
                locked.archive = Some(archive_bytes);
            }
            Box::pin(async { Ok(()) })
        });

    let start_capture = Arc::clone(capture);
    engine.expect_start_container().returning(move |_| {
        if let Ok(mut locked) = start_capture.lock() {
            locked.calls.push(String::from("start"));
        }
        Box::pin(async { Ok(()) })
    });

    engine
}

fn failure(error: &RegconfigError, calls: Vec<String>) -> ScenarioOutcome {
    let kind = match error {
        RegconfigError::Registry(RegistryError::EmptyAddress { .. }) => FailureKind::EmptyAddress,
        RegconfigError::Secret(SecretError::ResolutionFailed { address, .. }) => {
            FailureKind::ResolutionFailed(address.clone())
        }
        RegconfigError::Config(ConfigError::InvalidValue { field, .. }) if field == "mount.path" => {
            FailureKind::InvalidMountPath
        }
        _ => FailureKind::Other,
    };

    ScenarioOutcome::Failed {
        kind,
        message: error.to_string(),
        calls,
    }
}
