//! Command-line argument definitions for regconfig.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for regconfig.
#[derive(Debug, Parser)]
#[command(name = "regconfig")]
#[command(
    author,
    version,
    about = "Materialize container registry credentials as a Docker config.json secret"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine socket path or URL.
    #[arg(long, global = true)]
    pub engine_socket: Option<String>,

    /// Container image used by `run`.
    #[arg(long, global = true)]
    pub image: Option<String>,

    /// Register the secret under this name instead of a content-derived one.
    #[arg(long, global = true)]
    pub secret_name: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the rendered config.json document.
    Render,

    /// Print the name the secret would be registered under.
    Name,

    /// Run a container with the registry configuration mounted.
    Run(RunArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Container path of the mounted config.json.
    #[arg(long)]
    pub path: Option<String>,

    /// Container name.
    #[arg(long)]
    pub name: Option<String>,

    /// Command to execute; the image default is used when omitted.
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,
}
