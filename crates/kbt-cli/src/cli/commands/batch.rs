//! `kbt batch` – download several documents with bounded concurrency.

use anyhow::Result;
use kbt_core::{BatchOptions, CurlFetcher, DirectoryStorage, TransferManager};
use std::process::ExitCode;

use super::cancel_on_interrupt;
use crate::cli::render::print_json;

pub async fn run_batch(
    manager: &TransferManager<CurlFetcher, DirectoryStorage>,
    ids: Vec<String>,
    concurrency: usize,
    json: bool,
) -> Result<ExitCode> {
    let mut options = BatchOptions::new(concurrency);
    if json {
        options = options.on_event(print_json);
    } else {
        options = options
            .on_item_done(|id, result| match result {
                Ok(done) => println!("[ok]        {} -> {}", id, done.path.display()),
                Err(e) if !e.is_user_visible_failure() => println!("[skipped]   {}: {}", id, e),
                Err(e) => println!("[failed]    {}: {}", id, e),
            })
            .on_batch_progress(|done, total| eprintln!("  {}/{} settled", done, total));
    }

    let summary = cancel_on_interrupt(manager, manager.start_batch(ids, options)).await?;

    if !json {
        println!(
            "{} succeeded, {} failed, {} cancelled, {} skipped (of {})",
            summary.succeeded, summary.failed, summary.cancelled, summary.skipped, summary.total
        );
    }
    Ok(if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
