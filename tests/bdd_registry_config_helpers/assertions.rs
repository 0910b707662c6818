//! Then-step assertions for registry-configuration scenarios.

use std::io::Read;

use rstest_bdd_macros::then;

use super::state::{FailureKind, RegistryConfigState, ScenarioOutcome, StepResult};

#[then("the rendered document is {json}")]
fn the_rendered_document_is(
    registry_config_state: &RegistryConfigState,
    json: String,
) -> StepResult<()> {
    let (document, _) = materialized(registry_config_state)?;
    let rendered = String::from_utf8(document)
        .map_err(|error| format!("rendered document should be UTF-8: {error}"))?;

    if rendered == json.trim() {
        return Ok(());
    }

    Err(format!("expected document {json}, got {rendered}"))
}

#[then("the secret is registered as \"{name}\"")]
fn the_secret_is_registered_as(
    registry_config_state: &RegistryConfigState,
    name: String,
) -> StepResult<()> {
    let (document, secret_name) = materialized(registry_config_state)?;
    if secret_name != name {
        return Err(format!("expected secret name {name}, got {secret_name}"));
    }

    let store = registry_config_state
        .store
        .get()
        .ok_or_else(|| String::from("secret store should be initialised"))?;
    let stored = store
        .get(&name)
        .ok_or_else(|| format!("store should hold secret {name}"))?;

    if stored.expose_secret() == document.as_slice() {
        return Ok(());
    }

    Err(format!("stored contents for {name} differ from the rendered document"))
}

#[then("materialization fails with EmptyAddress")]
fn materialization_fails_with_empty_address(
    registry_config_state: &RegistryConfigState,
) -> StepResult<()> {
    assert_failure(registry_config_state, &FailureKind::EmptyAddress)
}

#[then("materialization fails with ResolutionFailed for \"{address}\"")]
fn materialization_fails_with_resolution_failed(
    registry_config_state: &RegistryConfigState,
    address: String,
) -> StepResult<()> {
    assert_failure(registry_config_state, &FailureKind::ResolutionFailed(address))
}

#[then("the run fails with an invalid mount path")]
fn the_run_fails_with_an_invalid_mount_path(
    registry_config_state: &RegistryConfigState,
) -> StepResult<()> {
    assert_failure(registry_config_state, &FailureKind::InvalidMountPath)
}

#[then("no secret is registered")]
fn no_secret_is_registered(registry_config_state: &RegistryConfigState) -> StepResult<()> {
    let store = registry_config_state
        .store
        .get()
        .ok_or_else(|| String::from("secret store should be initialised"))?;

    if store.is_empty() {
        return Ok(());
    }

    Err(format!("expected an empty store, found {:?}", store.names()))
}

#[then("the engine calls are {calls}")]
fn the_engine_calls_are(
    registry_config_state: &RegistryConfigState,
    calls: String,
) -> StepResult<()> {
    let expected: Vec<String> = calls
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(String::from)
        .collect();
    let observed = observed_calls(registry_config_state)?;

    if observed == expected {
        return Ok(());
    }

    Err(format!("expected engine calls {expected:?}, got {observed:?}"))
}

#[then("the engine is not contacted")]
fn the_engine_is_not_contacted(registry_config_state: &RegistryConfigState) -> StepResult<()> {
    let observed = observed_calls(registry_config_state)?;
    if observed.is_empty() {
        return Ok(());
    }

    Err(format!("expected no engine calls, got {observed:?}"))
}

#[then("the uploaded archive contains \"{path}\" with mode {mode}")]
fn the_uploaded_archive_contains(
    registry_config_state: &RegistryConfigState,
    path: String,
    mode: String,
) -> StepResult<()> {
    let expected_mode = u32::from_str_radix(mode.trim(), 8)
        .map_err(|error| format!("mode '{mode}' should be octal: {error}"))?;

    let outcome = registry_config_state
        .outcome
        .get()
        .ok_or_else(|| String::from("scenario outcome should be set"))?;
    let ScenarioOutcome::Ran {
        archive: Some(bytes),
        ..
    } = outcome
    else {
        return Err(format!("expected an uploaded archive, got {outcome:?}"));
    };

    let mut archive = tar::Archive::new(bytes.as_slice());
    let entries = archive
        .entries()
        .map_err(|error| format!("archive should be readable: {error}"))?;
    for entry_result in entries {
        let mut entry = entry_result.map_err(|error| format!("bad archive entry: {error}"))?;
        let entry_path = entry
            .path()
            .map_err(|error| format!("bad archive path: {error}"))?
            .to_string_lossy()
            .into_owned();
        if entry_path != path {
            continue;
        }

        let entry_mode = entry
            .header()
            .mode()
            .map_err(|error| format!("bad archive mode: {error}"))?;
        let mut contents = vec![];
        entry
            .read_to_end(&mut contents)
            .map_err(|error| format!("archive entry should be readable: {error}"))?;

        if entry_mode != expected_mode {
            return Err(format!("expected mode {expected_mode:o}, got {entry_mode:o}"));
        }
        if !contents.starts_with(b"{\"auths\":") {
            return Err(String::from("archive entry should hold a config.json document"));
        }
        return Ok(());
    }

    Err(format!("archive does not contain {path}"))
}

fn materialized(state: &RegistryConfigState) -> StepResult<(Vec<u8>, String)> {
    match state.outcome.get() {
        Some(ScenarioOutcome::Materialized {
            document,
            secret_name,
        }) => Ok((document, secret_name)),
        other => Err(format!("expected a materialized secret, got {other:?}")),
    }
}

fn observed_calls(state: &RegistryConfigState) -> StepResult<Vec<String>> {
    match state.outcome.get() {
        Some(ScenarioOutcome::Ran { calls, .. } | ScenarioOutcome::Failed { calls, .. }) => {
            Ok(calls)
        }
        other => Err(format!("expected a container run, got {other:?}")),
    }
}

fn assert_failure(state: &RegistryConfigState, expected: &FailureKind) -> StepResult<()> {
    match state.outcome.get() {
        Some(ScenarioOutcome::Failed { kind, .. }) if &kind == expected => Ok(()),
        Some(ScenarioOutcome::Failed { kind, message, .. }) => Err(format!(
            "expected failure {expected:?}, got {kind:?}: {message}"
        )),
        other => Err(format!("expected failure {expected:?}, got {other:?}")),
    }
}
