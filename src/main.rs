//! `regconfig` application entry point.
//!
//! Uses `eyre` for opaque error handling at the application boundary,
//! converting domain-specific errors into human-readable reports. Logs go to
//! stderr through `tracing-subscriber`, filtered by `RUST_LOG` (default
//! `warn`), so stdout carries only command output.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/regconfig/config.toml` or path from
//!    `REGCONFIG_CONFIG_PATH`)
//! 3. Environment variables (`REGCONFIG_*`)
//! 4. Command-line arguments

use clap::Parser;
use eyre::{Report, Result as EyreResult};
use mockable::DefaultEnv;
use regconfig::config::{AppConfig, Cli, Commands, RunArgs, load_config};
use regconfig::container::ContainerSpec;
use regconfig::engine::{EngineConnector, SocketResolver};
use regconfig::error::Result as RegconfigResult;
use regconfig::secret::{HostSecretResolver, MemorySecretStore, content_derived_name};
use tokio::runtime::Runtime;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str = "warn";

fn main() -> EyreResult<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli).map_err(Report::from)?;
    let runtime = EngineConnector::create_runtime().map_err(Report::from)?;

    run(&cli, &config, &runtime).map_err(Report::from)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Execute the CLI command, returning domain-specific errors.
fn run(cli: &Cli, config: &AppConfig, runtime: &Runtime) -> RegconfigResult<()> {
    let resolver = HostSecretResolver::new(DefaultEnv::new());

    match &cli.command {
        Commands::Render => render(config, runtime, &resolver),
        Commands::Name => print_name(config, runtime, &resolver),
        Commands::Run(args) => run_container(config, args, runtime, &resolver),
    }
}

/// Print the rendered `config.json` document.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn render(
    config: &AppConfig,
    runtime: &Runtime,
    resolver: &HostSecretResolver<DefaultEnv>,
) -> RegconfigResult<()> {
    let document = config
        .registry_config()?
        .render(runtime.handle(), resolver)?;
    println!("{}", String::from_utf8_lossy(&document));
    Ok(())
}

/// Print the name the secret would be registered under.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn print_name(
    config: &AppConfig,
    runtime: &Runtime,
    resolver: &HostSecretResolver<DefaultEnv>,
) -> RegconfigResult<()> {
    if let Some(name) = config.secret.name.as_deref() {
        println!("{name}");
        return Ok(());
    }

    let registry = config.registry_config()?;
    let document = registry.render(runtime.handle(), resolver)?;
    println!(
        "{}",
        content_derived_name(registry.secret_prefix(), &document)
    );
    Ok(())
}

/// Create and start a container with the registry configuration mounted.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn run_container(
    config: &AppConfig,
    args: &RunArgs,
    runtime: &Runtime,
    resolver: &HostSecretResolver<DefaultEnv>,
) -> RegconfigResult<()> {
    let mut spec = ContainerSpec::new(config.image.clone().unwrap_or_default())?
        .with_name(args.name.clone());
    if !args.command.is_empty() {
        spec = spec.with_exec(args.command.iter().cloned());
    }

    let store = MemorySecretStore::new();
    let mounted = config
        .secret_mount()?
        .mount(runtime.handle(), resolver, &store, spec)?;

    let env = DefaultEnv::new();
    let docker = EngineConnector::connect_with_fallback(
        config.engine_socket.as_deref(),
        &SocketResolver::new(&env),
    )?;
    runtime.block_on(EngineConnector::health_check_async(&docker))?;

    let container = EngineConnector::run(runtime.handle(), &docker, &mounted)?;
    println!("{}", container.container_id());
    Ok(())
}
