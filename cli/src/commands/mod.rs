//! CLI command definitions and dispatch.

mod apply;
mod copy;
mod delete;
mod destroy;
mod import;
mod inspect;
mod plan;
mod refresh;
mod schema;
mod state;
mod version;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use dockerless_core::config::{Declarations, ProviderConfig, DEFAULT_CONFIG_FILE};
use dockerless_runtime::provider::diagnostics::Diagnostic;
use dockerless_runtime::{ConfiguredProvider, DockerlessProvider};

use crate::state::{StateFile, DEFAULT_STATE_FILE};

/// dockerless: push images between registries without a docker daemon.
#[derive(Parser)]
#[command(name = "dockerless", version, about)]
pub struct Cli {
    /// Declaration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// State file
    #[arg(short, long, global = true, default_value = DEFAULT_STATE_FILE)]
    pub state: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Copy an image from a source reference to a target reference
    Copy(copy::CopyArgs),
    /// Print the manifest digest of a remote image
    Inspect(inspect::InspectArgs),
    /// Delete a remote image reference
    Delete(delete::DeleteArgs),
    /// Show changes needed to match the declarations
    Plan(plan::PlanArgs),
    /// Apply the declarations
    Apply(apply::ApplyArgs),
    /// Refresh recorded digests from the target registries
    Refresh(refresh::RefreshArgs),
    /// Import an existing image into state by digest
    Import(import::ImportArgs),
    /// Delete every image recorded in state
    Destroy(destroy::DestroyArgs),
    /// Inspect recorded state
    State(state::StateArgs),
    /// Print provider and resource schemas as JSON
    Schema(schema::SchemaArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Paths shared by all commands.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: PathBuf,
    pub state: PathBuf,
}

impl Context {
    /// Declarations from the config file, which must exist.
    pub(crate) fn declarations(&self) -> Result<Declarations, Box<dyn std::error::Error>> {
        Ok(Declarations::load(&self.config)?)
    }

    /// Provider block of the config file, or defaults when there is none.
    pub(crate) fn provider_config(&self) -> Result<ProviderConfig, Box<dyn std::error::Error>> {
        Ok(Declarations::load_or_default(&self.config)?.provider)
    }

    pub(crate) fn open_state(&self) -> Result<StateFile, Box<dyn std::error::Error>> {
        Ok(StateFile::load(&self.state)?)
    }
}

/// Configure the provider for this build.
pub(crate) fn configure(config: &ProviderConfig) -> Result<ConfiguredProvider, Diagnostic> {
    DockerlessProvider::new(dockerless_runtime::VERSION).configure(config)
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context {
        config: cli.config,
        state: cli.state,
    };

    match cli.command {
        Command::Copy(args) => copy::execute(args, &ctx).await,
        Command::Inspect(args) => inspect::execute(args, &ctx).await,
        Command::Delete(args) => delete::execute(args, &ctx).await,
        Command::Plan(args) => plan::execute(args, &ctx).await,
        Command::Apply(args) => apply::execute(args, &ctx).await,
        Command::Refresh(args) => refresh::execute(args, &ctx).await,
        Command::Import(args) => import::execute(args, &ctx).await,
        Command::Destroy(args) => destroy::execute(args, &ctx).await,
        Command::State(args) => state::execute(args, &ctx).await,
        Command::Schema(args) => schema::execute(args).await,
        Command::Version(args) => version::execute(args).await,
    }
}
