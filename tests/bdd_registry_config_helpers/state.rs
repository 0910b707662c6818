//! Shared behavioural-test state for registry-configuration scenarios.

use std::sync::Arc;

use regconfig::registry::RegistryConfig;
use regconfig::secret::MemorySecretStore;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;

/// Step result type for registry-configuration BDD tests.
pub type StepResult<T> = Result<T, String>;

/// High-level outcome observed after materializing or running.
#[derive(Clone, Debug)]
pub enum ScenarioOutcome {
    /// Materialization registered a secret.
    Materialized {
        /// The rendered `config.json` bytes.
        document: Vec<u8>,
        /// The name the secret was registered under.
        secret_name: String,
    },

    /// A container was created and started.
    Ran {
        /// Engine calls in the order they were made.
        calls: Vec<String>,
        /// Archive uploaded to the container, if any.
        archive: Option<Vec<u8>>,
    },

    /// The operation failed.
    Failed {
        /// The failure category.
        kind: FailureKind,
        /// Human-readable error message.
        message: String,
        /// Engine calls made before the failure.
        calls: Vec<String>,
    },
}

/// Categorized failure outcomes for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// A registry entry had a blank address.
    EmptyAddress,
    /// A secret reference could not be resolved for the address.
    ResolutionFailed(String),
    /// A mount path was rejected.
    InvalidMountPath,
    /// Anything else.
    Other,
}

/// Shared scenario state for registry-configuration behavioural tests.
#[derive(Default, ScenarioState)]
pub struct RegistryConfigState {
    /// The accumulator built by the given steps.
    pub(crate) config: Slot<RegistryConfig>,

    /// Environment variables visible to the secret resolver.
    pub(crate) env_vars: Slot<Vec<(String, String)>>,

    /// Explicit secret name, when a step sets one.
    pub(crate) secret_name: Slot<String>,

    /// Whether mounts skip empty configurations.
    pub(crate) skip_on_empty: Slot<bool>,

    /// Store the scenario registers secrets into.
    pub(crate) store: Slot<Arc<MemorySecretStore>>,

    /// Outcome of the most recent when-step.
    pub(crate) outcome: Slot<ScenarioOutcome>,
}

/// Fixture providing fresh state for each scenario.
#[fixture]
pub fn registry_config_state() -> RegistryConfigState {
    let state = RegistryConfigState::default();
    state.config.set(RegistryConfig::new());
    state.env_vars.set(vec![]);
    state.skip_on_empty.set(false);
    state.store.set(Arc::new(MemorySecretStore::new()));
    state
}
