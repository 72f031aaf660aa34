//! Tests for get, batch and config.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_get_defaults() {
    match parse(&["kbt", "get", "42"]) {
        CliCommand::Get {
            id,
            timeout_secs,
            max_retries,
            dir,
            json,
        } => {
            assert_eq!(id, "42");
            assert!(timeout_secs.is_none());
            assert!(max_retries.is_none());
            assert!(dir.is_none());
            assert!(!json);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_overrides() {
    match parse(&[
        "kbt",
        "get",
        "7",
        "--timeout-secs",
        "30",
        "--max-retries",
        "0",
        "--dir",
        "/tmp/docs",
        "--json",
    ]) {
        CliCommand::Get {
            id,
            timeout_secs,
            max_retries,
            dir,
            json,
        } => {
            assert_eq!(id, "7");
            assert_eq!(timeout_secs, Some(30));
            assert_eq!(max_retries, Some(0));
            assert_eq!(dir, Some(PathBuf::from("/tmp/docs")));
            assert!(json);
        }
        _ => panic!("expected Get with overrides"),
    }
}

#[test]
fn cli_parse_batch() {
    match parse(&["kbt", "batch", "1", "2", "3", "--concurrency", "2"]) {
        CliCommand::Batch {
            ids,
            concurrency,
            dir,
            json,
        } => {
            assert_eq!(ids, vec!["1", "2", "3"]);
            assert_eq!(concurrency, Some(2));
            assert!(dir.is_none());
            assert!(!json);
        }
        _ => panic!("expected Batch"),
    }
}

#[test]
fn cli_batch_requires_ids() {
    assert!(Cli::try_parse_from(["kbt", "batch"]).is_err());
}

#[test]
fn cli_get_rejects_bad_timeout() {
    assert!(Cli::try_parse_from(["kbt", "get", "1", "--timeout-secs", "soon"]).is_err());
}

#[test]
fn cli_parse_config() {
    match parse(&["kbt", "config"]) {
        CliCommand::Config => {}
        _ => panic!("expected Config"),
    }
}
