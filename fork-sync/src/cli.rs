/// # fork-sync CLI Interface (Module)
///
/// This module implements the full CLI interface for fork-sync—handling
/// command parsing, argument validation and the main entrypoint.
///
/// All core business logic (git plumbing, pipeline, config model) lives in
/// the [`fork-sync-core`] crate. This module is strictly for CLI glue,
/// ergonomic argument exposure and orchestration.
///
/// ## Features
/// - Entry struct [`Cli`] defines all user-facing options and subcommands.
/// - Subcommand routing (`sync`) and argument validation.
/// - Async entrypoint ([`run`]) for programmatic invocation and integration
///   testing.
///
/// ## How To Use
/// - For command-line users: use the installed `fork-sync` binary with
///   `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed
///   [`Cli`].
///
/// ## Extending
/// When adding subcommands, update [`Commands`] below and keep all
/// non-trivial business logic inside `fork-sync-core`.
use crate::load_config::load_config;
use crate::upload::S3Client;
use anyhow::Result;
use clap::{Parser, Subcommand};
use fork_sync_core::synchronise::synchronise;
use std::path::PathBuf;

/// CLI for fork-sync: merge upstream and publish changed documents.
#[derive(Parser)]
#[clap(
    name = "fork-sync",
    version,
    about = "Sync a fork with its upstream and upload changed PDFs to an object-storage bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the sync pipeline once using the given config file
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            config.trace_loaded();
            tracing::info!(command = "sync", "Starting synchronisation run");
            let store = S3Client::new_from_env()
                .map_err(|e| anyhow::anyhow!("Failed to construct object store from env: {e}"))?;
            match synchronise(&config, &store).await {
                Ok(report) => {
                    tracing::info!(command = "sync", ?report, "Synchronisation complete");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
