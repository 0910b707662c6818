//! Behavioural step helpers for registry-configuration scenarios.

mod assertions;
mod state;
mod steps;

pub use state::{RegistryConfigState, registry_config_state};
