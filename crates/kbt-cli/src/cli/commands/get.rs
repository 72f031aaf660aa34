//! `kbt get` – download one document.

use anyhow::Result;
use kbt_core::{CurlFetcher, DirectoryStorage, TransferError, TransferManager};
use std::process::ExitCode;
use std::time::Duration;

use super::cancel_on_interrupt;
use crate::cli::render::EventPrinter;

pub async fn run_get(
    manager: &TransferManager<CurlFetcher, DirectoryStorage>,
    id: &str,
    timeout: Option<Duration>,
    json: bool,
) -> Result<ExitCode> {
    let mut printer = EventPrinter::new(json);
    let timeout = timeout.unwrap_or(manager.settings().timeout);
    let result = cancel_on_interrupt(
        manager,
        manager.start_with_timeout(id, &mut printer, timeout),
    )
    .await;

    match result {
        Ok(done) => {
            if !json {
                println!("{}", done.path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(TransferError::Cancelled { .. }) => {
            if !json {
                eprintln!("cancelled");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if !json {
                eprintln!("{}", err);
                if err.is_retryable_by_user() {
                    eprintln!("run `kbt get {}` again to retry", id);
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
