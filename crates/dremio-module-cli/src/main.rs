// crates/dremio-module-cli/src/main.rs
// ============================================================================
// Module: Dremio Module CLI Entry Point
// Description: Command dispatcher for provisioning and offline utilities.
// Purpose: Run the module workflow and expose config, policy, and query tools.
// Dependencies: clap, dremio-module-*, serde_json, thiserror, tokio.
// ============================================================================

//! ## Overview
//! `dremio-module run` is the container entry point: it loads the module
//! config, resolves credentials from Vault, and provisions Dremio. The other
//! subcommands are offline helpers for operators: validating a config,
//! evaluating the sample rule on an input document, and previewing the
//! projection query for a set of columns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use dremio_module_cli::provision::provision;
use dremio_module_config::ModuleConfig;
use dremio_module_core::CatalogPath;
use dremio_module_core::ColumnTransformation;
use dremio_module_core::LogEvent;
use dremio_module_core::LogSink;
use dremio_module_core::PolicyInput;
use dremio_module_core::StderrLogSink;
use dremio_module_core::TransformKind;
use dremio_module_core::TransformPlan;
use dremio_module_core::evaluate_sample_rule;
use dremio_module_core::projection_query;
use dremio_module_dremio::DremioClient;
use dremio_module_dremio::DremioClientConfig;
use dremio_module_vault::VaultClient;
use dremio_module_vault::VaultClientConfig;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a policy input document.
const MAX_POLICY_INPUT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "dremio-module", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision Dremio from the module config.
    Run(RunCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Policy utilities.
    Policy {
        /// Selected policy subcommand.
        #[command(subcommand)]
        command: PolicyCommand,
    },
    /// Print the projection query for a table and restricted columns.
    Query(QueryCommand),
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
struct RunCommand {
    /// Path to the module config (defaults to `DREMIO_MODULE_CONFIG` or `/etc/conf/conf.yaml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the Dremio base URL from the config.
    #[arg(long, value_name = "URL")]
    dremio_url: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the module config.
    Validate {
        /// Path to the module config.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// Evaluate the sample finance/PII rule on a JSON input document.
    Eval {
        /// Path to the input document.
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
    },
}

/// Arguments for the `query` command.
#[derive(Args, Debug)]
struct QueryCommand {
    /// Table columns, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    columns: Vec<String>,
    /// Table path as `source/folder/table`.
    #[arg(long, value_name = "PATH")]
    table: String,
    /// Restricted columns, comma separated.
    #[arg(long, value_delimiter = ',')]
    restrict: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("dremio-module {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Policy {
            command,
        } => command_policy(command),
        Commands::Query(command) => command_query(&command),
    }
}

/// Prints the top-level help text.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let mut config = ModuleConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if let Some(url) = command.dremio_url {
        config.dremio.url = url;
        config.validate().map_err(|err| CliError::new(format!("invalid config: {err}")))?;
    }
    let log = StderrLogSink::new(config.logging.level, config.logging.app_uuid.clone());
    log.record(
        &LogEvent::info("dremio module starting")
            .field("datasets", config.datasets.len())
            .field("dremio_url", config.dremio.url.as_str()),
    );

    let report = tokio::task::spawn_blocking(move || {
        let vault = VaultClient::new(VaultClientConfig::default())
            .map_err(|err| CliError::new(err.to_string()))?;
        let dremio = DremioClient::new(DremioClientConfig::from_settings(&config.dremio))
            .map_err(|err| CliError::new(err.to_string()))?;
        provision(&config, &dremio, &vault, &log)
            .map_err(|err| CliError::new(format!("provisioning failed: {err}")))
    })
    .await
    .map_err(|err| CliError::new(format!("provisioning task failed: {err}")))??;

    write_json(&serde_json::to_value(&report).map_err(|err| CliError::new(err.to_string()))?)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate {
            config,
        } => {
            let config = ModuleConfig::load(config.as_deref())
                .map_err(|err| CliError::new(format!("invalid config: {err}")))?;
            write_json(&config_summary(&config))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Builds the JSON summary printed by `config validate`.
fn config_summary(config: &ModuleConfig) -> Value {
    let datasets: Vec<Value> = config
        .datasets
        .iter()
        .map(|dataset| {
            json!({
                "id": dataset.id.to_string(),
                "format": dataset.format.as_str(),
                "path": dataset.path,
                "endpoint": dataset.connection.endpoint_host(),
                "source": dataset.source_name(),
                "virtual_dataset": dataset.vds_name(),
                "restricted_columns": dataset.plan.restricted_columns(),
            })
        })
        .collect();
    json!({
        "valid": true,
        "dremio_url": config.dremio.url,
        "space": config.dremio.space,
        "datasets": datasets,
    })
}

// ============================================================================
// SECTION: Policy Command
// ============================================================================

/// Dispatches policy subcommands.
fn command_policy(command: PolicyCommand) -> CliResult<ExitCode> {
    match command {
        PolicyCommand::Eval {
            input,
        } => {
            let bytes = read_bytes_with_limit(&input, MAX_POLICY_INPUT_BYTES)?;
            let document: PolicyInput = serde_json::from_slice(&bytes).map_err(|err| {
                CliError::new(format!("invalid policy input {}: {err}", input.display()))
            })?;
            let outcome = evaluate_sample_rule(&document);
            let result = serde_json::to_value(&outcome)
                .map_err(|err| CliError::new(err.to_string()))?;
            write_json(&json!({ "result": result }))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Query Command
// ============================================================================

/// Executes the `query` command.
fn command_query(command: &QueryCommand) -> CliResult<ExitCode> {
    let table = CatalogPath::from_segments(command.table.split('/'));
    if table.segments().is_empty() {
        return Err(CliError::new("table path must not be empty".to_string()));
    }
    let restricted: Vec<String> =
        command.restrict.iter().map(|column| column.trim().to_string()).collect();
    let plan = TransformPlan::new(vec![ColumnTransformation {
        kind: TransformKind::Redact,
        action_name: TransformKind::Redact.as_str().to_string(),
        columns: restricted,
    }]);
    let columns: Vec<String> =
        command.columns.iter().map(|column| column.trim().to_string()).collect();
    let query = projection_query(&table, &columns, &plan)
        .ok_or_else(|| CliError::new("empty dataset: every column is restricted".to_string()))?;
    write_stdout_line(&query).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> CliResult<Vec<u8>> {
    let read_error =
        |err: std::io::Error| CliError::new(format!("failed to read {}: {err}", path.display()));
    let file = File::open(path).map_err(read_error)?;
    let limit = u64::try_from(max_bytes)
        .map_err(|_| CliError::new("input size limit exceeds u64".to_string()))?;
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(read_error)?;
    if bytes.len() > max_bytes {
        return Err(CliError::new(format!(
            "{} exceeds size limit of {max_bytes} bytes",
            path.display()
        )));
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a pretty-printed JSON document to stdout.
fn write_json(value: &Value) -> CliResult<()> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

#[cfg(test)]
mod main_tests;
