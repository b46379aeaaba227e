// crates/dremio-module-cli/src/provision.rs
// ============================================================================
// Module: Provisioning Workflow
// Description: Registers datasets in Dremio and exposes governed views.
// Purpose: Turn a module config into S3 sources, datasets, and policy VDSs.
// Dependencies: dremio-module-config, dremio-module-core, dremio-module-dremio,
//               dremio-module-vault, serde, thiserror
// ============================================================================

//! ## Overview
//! [`provision`] runs the whole module lifecycle against one Dremio server:
//! wait for it, bootstrap the admin user, log in, then for every dataset
//! create an S3 source, promote the data folder, read its columns, and build
//! a projection that drops restricted columns. The projections become
//! virtual datasets in a single space.
//! Invariants:
//! - A restricted column never appears in a created virtual dataset; an
//!   existing view with different SQL is rewritten to the current projection.
//! - A dataset whose columns are all restricted gets no virtual dataset.
//! - Every failure is logged as a user-facing event before it is returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use dremio_module_config::DatasetConfig;
use dremio_module_config::ModuleConfig;
use dremio_module_core::CatalogPath;
use dremio_module_core::LogEvent;
use dremio_module_core::LogSink;
use dremio_module_core::S3Credentials;
use dremio_module_core::projection_query;
use dremio_module_core::visible_columns;
use dremio_module_dremio::Creation;
use dremio_module_dremio::DremioClient;
use dremio_module_dremio::DremioError;
use dremio_module_dremio::JobPolling;
use dremio_module_dremio::Session;
use dremio_module_dremio::wait_ready;
use dremio_module_vault::VaultClient;
use dremio_module_vault::VaultError;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Credential Source
// ============================================================================

/// Source of object-store credentials for a dataset.
pub trait CredentialSource: Send + Sync {
    /// Returns the S3 key pair for `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the credentials cannot be resolved.
    fn s3_credentials(
        &self,
        dataset: &DatasetConfig,
        log: &dyn LogSink,
    ) -> Result<S3Credentials, VaultError>;
}

impl CredentialSource for VaultClient {
    fn s3_credentials(
        &self,
        dataset: &DatasetConfig,
        log: &dyn LogSink,
    ) -> Result<S3Credentials, VaultError> {
        self.fetch_s3_credentials(&dataset.connection.vault_credentials, &dataset.id, log)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the provisioning workflow.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Credentials for a dataset could not be resolved.
    #[error("credentials for dataset {dataset} unavailable: {source}")]
    Credentials {
        /// Dataset identifier.
        dataset: String,
        /// Underlying Vault error.
        source: VaultError,
    },
    /// A Dremio call failed.
    #[error("dremio step '{step}' failed: {source}")]
    Dremio {
        /// Workflow step that failed.
        step: &'static str,
        /// Underlying Dremio error.
        source: DremioError,
    },
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Outcome of provisioning a single dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetReport {
    /// Dataset identifier.
    pub dataset_id: String,
    /// Name of the S3 source in Dremio.
    pub source: String,
    /// Name of the virtual dataset, when one was created.
    pub virtual_dataset: Option<String>,
    /// Columns exposed through the virtual dataset.
    pub visible_columns: Vec<String>,
    /// Columns removed by the transformation plan.
    pub restricted_columns: Vec<String>,
}

/// Outcome of a full provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Space holding the virtual datasets.
    pub space: String,
    /// Per-dataset outcomes, in config order.
    pub datasets: Vec<DatasetReport>,
    /// Extra user created, if any.
    pub extra_user: Option<String>,
}

/// A dataset whose physical table is ready for its projection.
struct PreparedDataset<'a> {
    /// Dataset configuration.
    dataset: &'a DatasetConfig,
    /// Catalog path of the promoted table.
    table: CatalogPath,
    /// Projection query, absent when no column is visible.
    query: Option<String>,
    /// Columns the projection keeps.
    visible: Vec<String>,
}

// ============================================================================
// SECTION: Workflow
// ============================================================================

/// Runs the provisioning workflow.
///
/// # Errors
///
/// Returns [`ProvisionError`] on the first step that fails; the failure has
/// already been logged.
pub fn provision(
    config: &ModuleConfig,
    dremio: &DremioClient,
    credentials: &dyn CredentialSource,
    log: &dyn LogSink,
) -> Result<ProvisionReport, ProvisionError> {
    let settings = &config.dremio;
    let address = dremio.socket_address().map_err(|err| failed(log, "connect", err))?;
    wait_ready(
        &address,
        settings.ready_attempts,
        Duration::from_millis(settings.ready_interval_ms),
        log,
    )
    .map_err(|err| failed(log, "wait", err))?;

    let bootstrap =
        dremio.bootstrap_first_user(settings).map_err(|err| failed(log, "bootstrap", err))?;
    log.record(&LogEvent::info("register user response").field("outcome", describe(&bootstrap)));
    let session = dremio
        .login(&settings.admin_user, &settings.admin_password)
        .map_err(|err| failed(log, "login", err))?;
    log.record(&LogEvent::info("logged in to dremio").field("user", settings.admin_user.as_str()));

    let polling = JobPolling::from_settings(settings);
    let mut prepared = Vec::with_capacity(config.datasets.len());
    for dataset in &config.datasets {
        prepared.push(prepare_dataset(dremio, &session, dataset, credentials, polling, log)?);
    }

    let space = dremio
        .create_space(&session, &settings.space)
        .map_err(|err| failed(log, "create space", err))?;
    log.record(
        &LogEvent::info("created space")
            .field("space", settings.space.as_str())
            .field("outcome", describe(&space)),
    );

    let mut datasets = Vec::with_capacity(prepared.len());
    for entry in prepared {
        datasets.push(publish_dataset(dremio, &session, &settings.space, entry, log)?);
    }

    let extra_user = match &settings.extra_user {
        Some(user) => {
            let outcome = dremio
                .create_user(&session, user)
                .map_err(|err| failed(log, "create user", err))?;
            log.record(
                &LogEvent::debug("create new user response")
                    .field("user", user.name.as_str())
                    .field("outcome", describe(&outcome)),
            );
            Some(user.name.clone())
        }
        None => None,
    };

    log.record(&LogEvent::info("Finished!"));
    Ok(ProvisionReport {
        space: settings.space.clone(),
        datasets,
        extra_user,
    })
}

/// Creates the source for a dataset, promotes its folder, and builds its query.
fn prepare_dataset<'a>(
    dremio: &DremioClient,
    session: &Session,
    dataset: &'a DatasetConfig,
    credentials: &dyn CredentialSource,
    polling: JobPolling,
    log: &dyn LogSink,
) -> Result<PreparedDataset<'a>, ProvisionError> {
    let creds = credentials.s3_credentials(dataset, log).map_err(|source| {
        ProvisionError::Credentials {
            dataset: dataset.id.to_string(),
            source,
        }
    })?;
    let source_name = dataset.source_name();
    log.record(
        &LogEvent::info("Creating S3 resource").dataset(&dataset.id).field("source", source_name),
    );
    let created = dremio
        .create_s3_source(session, source_name, &creds, dataset.connection.endpoint_host())
        .map_err(|err| failed_for(log, dataset, "create source", err))?;
    log.record(
        &LogEvent::debug("new source response")
            .dataset(&dataset.id)
            .field("outcome", describe(&created)),
    );

    let table = CatalogPath::from_source_and_path(source_name, &dataset.path);
    let folder = dremio
        .catalog_by_path(session, &table)
        .map_err(|err| failed_for(log, dataset, "lookup folder", err))?;
    log.record(
        &LogEvent::info("Get path of the data folder")
            .dataset(&dataset.id)
            .field("entity_type", folder.get("entityType").cloned().unwrap_or_default()),
    );
    let promoted = dremio
        .promote_folder(session, &table, dataset.format)
        .map_err(|err| failed_for(log, dataset, "promote folder", err))?;
    log.record(
        &LogEvent::debug("promote response")
            .dataset(&dataset.id)
            .field("format", dataset.format.as_str())
            .field("outcome", describe(&promoted)),
    );

    let columns = dremio
        .table_columns(session, &table, polling)
        .map_err(|err| failed_for(log, dataset, "read columns", err))?;
    log.record(
        &LogEvent::debug("Table's columns").dataset(&dataset.id).field("columns", columns.clone()),
    );
    let visible = visible_columns(&columns, &dataset.plan);
    let query = projection_query(&table, &columns, &dataset.plan);
    match &query {
        Some(sql) => {
            log.record(
                &LogEvent::debug("SQL to build VDS")
                    .dataset(&dataset.id)
                    .field("sql", sql.as_str()),
            );
        }
        None => log.record(&LogEvent::debug("empty dataset").dataset(&dataset.id).for_user()),
    }
    Ok(PreparedDataset {
        dataset,
        table,
        query,
        visible,
    })
}

/// Creates the virtual dataset for a prepared dataset, if it has a query.
fn publish_dataset(
    dremio: &DremioClient,
    session: &Session,
    space: &str,
    entry: PreparedDataset<'_>,
    log: &dyn LogSink,
) -> Result<DatasetReport, ProvisionError> {
    let dataset = entry.dataset;
    let virtual_dataset = match &entry.query {
        Some(sql) => {
            let name = dataset.vds_name();
            log.record(
                &LogEvent::info("Creating VDS").dataset(&dataset.id).field("name", name.as_str()),
            );
            let outcome = dremio
                .create_virtual_dataset(session, space, &name, sql, &entry.table)
                .map_err(|err| failed_for(log, dataset, "create vds", err))?;
            log.record(
                &LogEvent::info("Create VDS response")
                    .dataset(&dataset.id)
                    .field("outcome", describe(&outcome)),
            );
            if outcome == Creation::AlreadyExists {
                refresh_view(dremio, session, space, &name, sql, &entry, log)?;
            }
            Some(name)
        }
        None => None,
    };
    Ok(DatasetReport {
        dataset_id: dataset.id.to_string(),
        source: dataset.source_name().to_string(),
        virtual_dataset,
        visible_columns: entry.visible,
        restricted_columns: dataset.plan.restricted_columns(),
    })
}

/// Brings an existing view in line with the current projection.
///
/// A view left by an earlier run may still select columns that are now
/// restricted, so its SQL is replaced whenever it differs.
fn refresh_view(
    dremio: &DremioClient,
    session: &Session,
    space: &str,
    name: &str,
    sql: &str,
    entry: &PreparedDataset<'_>,
    log: &dyn LogSink,
) -> Result<(), ProvisionError> {
    let dataset = entry.dataset;
    let view = CatalogPath::from_segments([space, name]);
    let existing = dremio
        .virtual_dataset(session, &view)
        .map_err(|err| failed_for(log, dataset, "lookup vds", err))?;
    if existing.sql == sql {
        log.record(&LogEvent::debug("VDS up to date").dataset(&dataset.id).field("name", name));
        return Ok(());
    }
    dremio
        .update_virtual_dataset(session, &existing, sql, &entry.table)
        .map_err(|err| failed_for(log, dataset, "update vds", err))?;
    log.record(&LogEvent::info("Updated VDS").dataset(&dataset.id).field("name", name));
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Short label for a create-style outcome.
const fn describe(outcome: &Creation) -> &'static str {
    match outcome {
        Creation::Created(_) => "created",
        Creation::AlreadyExists => "already exists",
    }
}

/// Logs and wraps a Dremio failure not tied to a dataset.
fn failed(log: &dyn LogSink, step: &'static str, source: DremioError) -> ProvisionError {
    log.record(&LogEvent::error(format!("{step} failed")).for_user().with_error(&source));
    ProvisionError::Dremio {
        step,
        source,
    }
}

/// Logs and wraps a Dremio failure for a dataset.
fn failed_for(
    log: &dyn LogSink,
    dataset: &DatasetConfig,
    step: &'static str,
    source: DremioError,
) -> ProvisionError {
    log.record(
        &LogEvent::error(format!("{step} failed"))
            .dataset(&dataset.id)
            .for_user()
            .with_error(&source),
    );
    ProvisionError::Dremio {
        step,
        source,
    }
}
