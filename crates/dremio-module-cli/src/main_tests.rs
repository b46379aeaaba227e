// crates/dremio-module-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and offline command helpers.
// Purpose: Pin the CLI surface and bounded input reads.
// Dependencies: dremio-module-cli main helpers
// ============================================================================

//! ## Overview
//! Exercises clap parsing, the config summary, and size-limited reads.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use clap::Parser;
use dremio_module_config::ModuleConfig;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::QueryCommand;
use super::command_query;
use super::config_summary;
use super::read_bytes_with_limit;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn parses_query_lists() {
    let cli = Cli::try_parse_from([
        "dremio-module",
        "query",
        "--columns",
        "step,nameOrig,amount",
        "--table",
        "src/db/t",
        "--restrict",
        "nameOrig",
    ])
    .unwrap();
    let Some(Commands::Query(query)) = cli.command else {
        panic!("expected query command");
    };
    assert_eq!(query.columns, ["step", "nameOrig", "amount"]);
    assert_eq!(query.restrict, ["nameOrig"]);
}

#[test]
fn parses_config_validate_and_version() {
    let args = ["dremio-module", "config", "validate", "--config", "/tmp/c.yaml"];
    let cli = Cli::try_parse_from(args).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommand::Validate { config: Some(_) }
        })
    ));
    let cli = Cli::try_parse_from(["dremio-module", "--version"]).unwrap();
    assert!(cli.show_version);
    assert!(Cli::try_parse_from(["dremio-module", "query", "--table", "a/b"]).is_err());
}

#[test]
fn query_rejects_fully_restricted_tables() {
    let command = QueryCommand {
        columns: vec!["a".to_string()],
        table: "src/t".to_string(),
        restrict: vec!["a".to_string()],
    };
    let err = command_query(&command).unwrap_err();
    assert!(err.to_string().contains("empty dataset"));

    let command = QueryCommand {
        columns: vec!["a".to_string()],
        table: "//".to_string(),
        restrict: Vec::new(),
    };
    assert!(command_query(&command).is_err());
}

#[test]
fn summary_lists_restricted_columns() {
    // [{"name":"RedactAction","RedactAction":{"columns":["nameOrig"]}}]
    let document = "\
data:
  - name: ns/paysim
    format: parquet
    path: bucket/paysim
    connection:
      s3:
        endpoint_url: http://minio:9000
    transformations: W3sibmFtZSI6IlJlZGFjdEFjdGlvbiIsIlJlZGFjdEFjdGlvbiI6eyJjb2x1bW5zIjpbIm5hbWVPcmlnIl19fV0=
";
    let config = ModuleConfig::from_yaml_str(document).unwrap();
    let summary = config_summary(&config);
    let dataset = &summary["datasets"][0];
    assert_eq!(dataset["id"], "ns/paysim");
    assert_eq!(dataset["endpoint"], "minio:9000");
    assert_eq!(dataset["virtual_dataset"], "paysim-vds");
    assert_eq!(dataset["restricted_columns"], serde_json::json!(["nameOrig"]));
    assert_eq!(summary["space"], "Space-api");
}

#[test]
fn bounded_read_fails_closed() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[b'x'; 64]).unwrap();
    assert_eq!(read_bytes_with_limit(file.path(), 64).unwrap().len(), 64);
    let err = read_bytes_with_limit(file.path(), 63).unwrap_err();
    assert!(err.to_string().contains("exceeds size limit"));
    let dir = tempfile::tempdir().unwrap();
    assert!(read_bytes_with_limit(&dir.path().join("missing.json"), 64).is_err());
}
