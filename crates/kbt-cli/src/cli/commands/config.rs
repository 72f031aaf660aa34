//! `kbt config` – show where the config lives and what is in effect.

use anyhow::Result;
use kbt_core::config::{self, KbtConfig};

pub fn run_config(cfg: &KbtConfig) -> Result<()> {
    println!("config file: {}", config::config_path()?.display());
    println!("{}", serde_json::to_string_pretty(cfg)?);
    let settings = cfg.transfer_settings()?;
    println!(
        "effective: {} attempt(s) per transfer, timeout {}s, batch concurrency {}",
        settings.retry_policy.max_attempts(),
        settings.timeout.as_secs(),
        settings.batch_concurrency
    );
    Ok(())
}
