//! Command-line entry point for the server catalog.
//!
//! Usage:
//!
//! ```text
//! census [--config FILE] [--registry FILE] run [--force] [--max-in-flight N] [--timeout-secs S]
//! census [--config FILE] [--registry FILE] report
//! census [--config FILE] [--registry FILE] add <name> [--location LOC]
//! ```
//!
//! Command output goes to stdout; logs go to stderr and honour `RUST_LOG`.

use camino::Utf8PathBuf;
use census::catalog::{
    adapters::{
        artifacts::FileAdapterGenerator, json_file::JsonFileRegistryStore,
        rpc::RpcDiscoveryProber,
    },
    services::{CatalogService, CatalogServiceError, RunCoordinator, RunCoordinatorError},
};
use census::config::{ConfigError, PipelineConfig};
use clap::{Parser, Subcommand};
use mockable::DefaultClock;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "census",
    version,
    about = "Discover and adapt catalogued MCP servers."
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "CENSUS_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Registry document, overriding the configuration.
    #[arg(long, global = true, env = "CENSUS_REGISTRY")]
    registry: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Test selected entries and generate adapters.
    Run {
        /// Re-test every entry, not only untested ones.
        #[arg(long)]
        force: bool,

        /// Number of concurrent workers.
        #[arg(long, env = "CENSUS_MAX_IN_FLIGHT")]
        max_in_flight: Option<usize>,

        /// Per-attempt discovery timeout in seconds.
        #[arg(long, env = "CENSUS_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,

        /// Directory receiving generated adapters.
        #[arg(long, env = "CENSUS_OUTPUT_DIR")]
        output_dir: Option<Utf8PathBuf>,
    },
    /// Summarize registry progress.
    Report,
    /// Append a pending entry.
    Add {
        /// Unique server name.
        name: String,

        /// `http(s)://` URL or `stdio:<command line>`.
        #[arg(long)]
        location: Option<String>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogServiceError),
    #[error(transparent)]
    Run(#[from] RunCoordinatorError),
    #[error("cannot build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cannot start async runtime: {0}")]
    Runtime(io::Error),
    #[error("cannot write output: {0}")]
    Output(io::Error),
}

impl CliError {
    const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Catalog(CatalogServiceError::Store(_))
            | Self::Run(RunCoordinatorError::Store(_)) => 3,
            Self::Catalog(_)
            | Self::Run(_)
            | Self::Http(_)
            | Self::Runtime(_)
            | Self::Output(_) => 1,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            if let Err(write_err) = writeln!(io::stderr(), "census: {err}") {
                error!(%write_err, "cannot report failure on stderr");
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn execute(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(registry) = cli.registry {
        config.registry_path = registry;
    }

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(dispatch(cli.command, config))
}

async fn dispatch(command: Command, mut config: PipelineConfig) -> Result<(), CliError> {
    match command {
        Command::Run {
            force,
            max_in_flight,
            timeout_secs,
            output_dir,
        } => {
            if let Some(workers) = max_in_flight {
                config.max_in_flight = workers;
            }
            if let Some(timeout) = timeout_secs {
                config.probe_timeout_secs = timeout;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            config.validate()?;
            run(&config, force).await
        }
        Command::Report => {
            config.validate()?;
            let service = CatalogService::new(Arc::new(registry_store(&config)));
            let outcome = service.report().await?;
            write_output(&outcome)
        }
        Command::Add { name, location } => {
            config.validate()?;
            let service = CatalogService::new(Arc::new(registry_store(&config)));
            let entry = service.add_entry(&name, location).await?;
            write_output(&format_args!(
                "added {} ({})\n",
                entry.name(),
                entry.location().unwrap_or("no location")
            ))
        }
    }
}

async fn run(config: &PipelineConfig, force: bool) -> Result<(), CliError> {
    let coordinator = RunCoordinator::new(
        Arc::new(registry_store(config)),
        Arc::new(RpcDiscoveryProber::new()?),
        Arc::new(FileAdapterGenerator::new(
            config.output_dir.clone(),
            config.synthesis_options(),
        )),
        Arc::new(DefaultClock),
        config.run_options(force),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, finishing in-flight work");
                on_interrupt.cancel();
            }
            Err(err) => warn!(%err, "cannot listen for interrupts"),
        }
    });

    info!(registry = %config.registry_path, output = %config.output_dir, "starting run");
    let summary = coordinator.run(cancel).await?;
    write_output(&summary)
}

fn registry_store(config: &PipelineConfig) -> JsonFileRegistryStore {
    JsonFileRegistryStore::new(config.registry_path.clone())
}

fn write_output(value: &dyn std::fmt::Display) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{value}")
        .and_then(|()| stdout.flush())
        .map_err(CliError::Output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use census::catalog::{
        domain::{CatalogDomainError, ServerName},
        ports::RegistryStoreError,
    };
    use rstest::rstest;

    fn missing_registry() -> RegistryStoreError {
        RegistryStoreError::NotFound("registry.json".to_owned())
    }

    #[rstest]
    #[case(
        CliError::Config(ConfigError::InvalidSetting {
            name: "max_in_flight",
            reason: "must be at least 1".to_owned(),
        }),
        2
    )]
    #[case(CliError::Catalog(CatalogServiceError::Store(missing_registry())), 3)]
    #[case(CliError::Run(RunCoordinatorError::Store(missing_registry())), 3)]
    #[case(
        CliError::Catalog(CatalogServiceError::DuplicateName(
            ServerName::new("Docs").expect("valid server name")
        )),
        1
    )]
    #[case(CliError::Catalog(CatalogServiceError::Domain(CatalogDomainError::EmptyLocation)), 1)]
    #[case(CliError::Run(RunCoordinatorError::Worker("panicked".to_owned())), 1)]
    fn exit_code_reserves_three_for_storage(#[case] error: CliError, #[case] expected: u8) {
        assert_eq!(error.exit_code(), expected);
    }
}
