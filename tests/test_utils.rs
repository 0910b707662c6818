//! Shared test utilities for integration tests.
//!
//! Environment variables are process-global, so every test that touches them
//! goes through the guard defined here.

use std::sync::{Mutex, MutexGuard};

use regconfig::config::env_var_names;

/// Global mutex protecting environment variable access.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard for exclusive environment variable access.
pub struct EnvGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl EnvGuard<'_> {
    /// Acquire exclusive access to the environment.
    ///
    /// A poisoned mutex is still acquired so later tests can run.
    #[must_use]
    pub fn lock() -> EnvGuard<'static> {
        let guard = ENV_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        EnvGuard { _guard: guard }
    }
}

/// Clears all `REGCONFIG_*` environment variables and returns a guard.
///
/// Keep the guard alive for the whole test.
///
/// # Safety
///
/// `std::env::remove_var` is unsafe in Rust 2024; the guard serialises all
/// environment access in this binary.
#[must_use]
pub fn clear_regconfig_env() -> EnvGuard<'static> {
    let guard = EnvGuard::lock();

    // SAFETY: Mutex guard ensures exclusive access to environment variables.
    unsafe {
        std::env::remove_var("REGCONFIG_CONFIG_PATH");
    }

    for var in env_var_names() {
        // SAFETY: Mutex guard ensures exclusive access to environment variables.
        unsafe {
            std::env::remove_var(var);
        }
    }

    guard
}

/// Sets an environment variable while the caller holds `_guard`.
pub fn set_env_var(_guard: &EnvGuard<'_>, key: &str, value: &str) {
    // SAFETY: The caller's guard ensures exclusive access to environment variables.
    unsafe {
        std::env::set_var(key, value);
    }
}
