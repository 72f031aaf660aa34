//! CLI for the KBT transfer manager.

mod commands;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kbt_core::config::{self, KbtConfig};
use kbt_core::{CurlFetcher, DirectoryStorage, TransferManager};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::{run_batch, run_config, run_get};

/// Top-level CLI for the KBT transfer manager.
#[derive(Debug, Parser)]
#[command(name = "kbt")]
#[command(about = "KBT: download knowledge-base documents with progress and retry", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one document by its ID.
    Get {
        /// Document identifier.
        id: String,
        /// Per-attempt timeout in seconds (overrides config).
        #[arg(long, value_name = "N")]
        timeout_secs: Option<u64>,
        /// Automatic retries after the first attempt (overrides config).
        #[arg(long, value_name = "N")]
        max_retries: Option<u32>,
        /// Directory to save into (default: config, then current directory).
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,
        /// Print every transfer event as a JSON line.
        #[arg(long)]
        json: bool,
    },

    /// Download several documents, a few at a time.
    Batch {
        /// Document identifiers.
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
        /// Documents transferred at once (overrides config).
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
        /// Directory to save into (default: config, then current directory).
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,
        /// Print every transfer event as a JSON line.
        #[arg(long)]
        json: bool,
    },

    /// Show the config file location and effective settings.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<ExitCode> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                id,
                timeout_secs,
                max_retries,
                dir,
                json,
            } => {
                let manager = build_manager(&cfg, dir, max_retries)?;
                let timeout = timeout_secs.map(config::validate_timeout_secs).transpose()?;
                run_get(&manager, &id, timeout, json).await
            }
            CliCommand::Batch {
                ids,
                concurrency,
                dir,
                json,
            } => {
                let manager = build_manager(&cfg, dir, None)?;
                let concurrency = concurrency.unwrap_or(manager.settings().batch_concurrency);
                run_batch(&manager, ids, concurrency, json).await
            }
            CliCommand::Config => {
                run_config(&cfg)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn build_manager(
    cfg: &KbtConfig,
    dir: Option<PathBuf>,
    max_retries: Option<u32>,
) -> Result<TransferManager<CurlFetcher, DirectoryStorage>> {
    let mut settings = cfg.transfer_settings()?;
    if let Some(n) = max_retries {
        settings.retry_policy = settings.retry_policy.with_max_retries(n);
    }
    let download_dir = match dir.or_else(|| cfg.download_dir.clone()) {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    tracing::debug!(dir = %download_dir.display(), "saving downloads");
    let fetcher = CurlFetcher::from_config(&cfg.server)?;
    Ok(TransferManager::new(
        fetcher,
        DirectoryStorage::new(download_dir),
        settings,
    ))
}

#[cfg(test)]
mod tests;
