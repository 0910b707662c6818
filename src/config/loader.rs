//! Configuration loading with layered precedence.
//!
//! Precedence (lowest to highest): application defaults, configuration file,
//! environment variables, command-line arguments.
//!
//! Layers are composed with `MergeComposer` by hand rather than through the
//! derived `load()`: the `Cli` struct owns subcommand dispatch, and typed
//! environment values must fail fast instead of being dropped.
//!
//! # Environment Variable Handling
//!
//! String fields (e.g., `REGCONFIG_IMAGE`) are always accepted. Typed fields
//! like `REGCONFIG_MOUNT_SKIP_ON_EMPTY` (boolean) or `REGCONFIG_MOUNT_MODE`
//! (octal permission bits such as `0600`) return an error when unparseable.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};
use tracing::debug;

use crate::config::{AppConfig, Cli, Commands};
use crate::error::{ConfigError, Result};

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// String value (always accepted).
    String,
    /// Boolean value (`true`/`false`).
    Bool,
    /// Octal permission bits, with or without a `0o` prefix.
    Mode,
}

/// Description of a single environment variable mapping.
struct EnvVarSpec {
    env_var: &'static str,
    path: &'static [&'static str],
    var_type: EnvVarType,
}

const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "REGCONFIG_ENGINE_SOCKET",
        path: &["engine_socket"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "REGCONFIG_IMAGE",
        path: &["image"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "REGCONFIG_SECRET_NAME_PREFIX",
        path: &["secret", "name_prefix"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "REGCONFIG_SECRET_NAME",
        path: &["secret", "name"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "REGCONFIG_MOUNT_PATH",
        path: &["mount", "path"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "REGCONFIG_MOUNT_SKIP_ON_EMPTY",
        path: &["mount", "skip_on_empty"],
        var_type: EnvVarType::Bool,
    },
    EnvVarSpec {
        env_var: "REGCONFIG_MOUNT_MODE",
        path: &["mount", "mode"],
        var_type: EnvVarType::Mode,
    },
    EnvVarSpec {
        env_var: "REGCONFIG_MOUNT_OWNER",
        path: &["mount", "owner"],
        var_type: EnvVarType::String,
    },
];

/// Returns the list of environment variable names recognised by the config loader.
///
/// Tests use this to clear every `REGCONFIG_*` variable without keeping a
/// second list in sync.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.env_var).collect()
}

/// Read a TOML configuration file through `cap_std` and push it to the composer.
fn load_config_file(path: &Utf8Path, composer: &mut MergeComposer) -> Result<()> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    debug!(path = %path, "loaded configuration file");
    composer.push_file(value, Some(path.to_path_buf()));
    Ok(())
}

/// Load configuration with full layer precedence.
///
/// This function loads configuration from all available sources:
/// 1. Application defaults defined in the struct
/// 2. Configuration file (`--config`, or discovered via `REGCONFIG_CONFIG_PATH`
///    and XDG paths)
/// 3. Environment variables prefixed with `REGCONFIG_`
/// 4. Command-line arguments (from the provided `Cli`)
///
/// Later sources override earlier ones.
///
/// # Errors
///
/// Returns `ConfigError` if configuration loading fails due to:
/// - A `--config` path that does not exist
/// - Malformed configuration files
/// - Invalid typed environment variable values
/// - Layer merging failures
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(path) = resolve_config_path(cli)? {
        load_config_file(&path, &mut composer)?;
    }

    let env_values = collect_env_vars(|name| std::env::var(name).ok())?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;

    Ok(config)
}

/// Pick the explicit `--config` path, or the first discovered candidate.
fn resolve_config_path(cli: &Cli) -> Result<Option<Utf8PathBuf>> {
    if let Some(explicit) = &cli.config {
        if !explicit.exists() {
            return Err(ConfigError::FileNotFound {
                path: explicit.clone().into_std_path_buf(),
            }
            .into());
        }
        return Ok(Some(explicit.clone()));
    }

    let discovery = ConfigDiscovery::builder("regconfig")
        .env_var("REGCONFIG_CONFIG_PATH")
        .config_file_name("config.toml")
        .dotfile_name(".regconfig.toml")
        .build();
    Ok(discovery
        .candidates()
        .into_iter()
        .filter(|p| p.exists())
        .find_map(|p| Utf8PathBuf::try_from(p).ok()))
}

/// Collect `REGCONFIG_*` values into a JSON object, using `lookup` to read
/// each variable.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when a typed variable cannot be parsed.
pub(super) fn collect_env_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Some(raw_value) = lookup(spec.env_var) else {
            continue;
        };

        let json_value = match spec.var_type {
            EnvVarType::String => Value::String(raw_value),
            EnvVarType::Bool => Value::Bool(raw_value.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue {
                    field: spec.env_var.to_owned(),
                    reason: format!("expected bool (true/false), got '{raw_value}'"),
                }
            })?),
            EnvVarType::Mode => Value::Number(
                parse_mode(&raw_value)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        field: spec.env_var.to_owned(),
                        reason: format!("expected octal permission bits, got '{raw_value}'"),
                    })?
                    .into(),
            ),
        };

        insert_at_path(&mut root, spec.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Parse `0600`, `600`, or `0o600` as permission bits.
pub(super) fn parse_mode(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
}

/// Insert a value at a nested path in a JSON map.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(field.to_owned(), value);
}

/// Build a JSON value containing CLI overrides.
pub(super) fn build_cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();

    let run_path = match &cli.command {
        Commands::Run(args) => args.path.as_ref(),
        Commands::Render | Commands::Name => None,
    };

    let pairs: [(&[&str], Option<&String>); 4] = [
        (&["engine_socket"], cli.engine_socket.as_ref()),
        (&["image"], cli.image.as_ref()),
        (&["secret", "name"], cli.secret_name.as_ref()),
        (&["mount", "path"], run_path),
    ];
    for (path, value) in pairs {
        if let Some(text) = value {
            insert_at_path(&mut overrides, path, Value::String(text.clone()));
        }
    }

    if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    }
}
