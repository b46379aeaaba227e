// crates/dremio-module-dremio/src/payloads.rs
// ============================================================================
// Module: Dremio Request Payloads
// Description: JSON bodies for the Dremio endpoints the module calls.
// Purpose: Keep request shapes pure and testable without a server.
// Dependencies: dremio-module-config, dremio-module-core, serde_json
// ============================================================================

//! ## Overview
//! Each function returns the exact JSON document sent to one endpoint.

use dremio_module_config::DremioSettings;
use dremio_module_config::ExtraUser;
use dremio_module_core::CatalogPath;
use dremio_module_core::DataFormat;
use dremio_module_core::S3Credentials;
use serde_json::Value;
use serde_json::json;

/// Body for `PUT /apiv2/bootstrap/firstuser`.
#[must_use]
pub fn first_user(settings: &DremioSettings, created_at_ms: u64) -> Value {
    json!({
        "userName": settings.admin_user,
        "firstName": settings.admin_first_name,
        "lastName": settings.admin_last_name,
        "email": settings.admin_email,
        "createdAt": created_at_ms,
        "password": settings.admin_password,
    })
}

/// Body for `POST /apiv2/login`.
#[must_use]
pub fn login(user: &str, password: &str) -> Value {
    json!({ "userName": user, "password": password })
}

/// Body for creating an S3 source.
///
/// The endpoint is addressed with path-style access over plain HTTP, which is
/// what in-cluster object stores (MinIO, localstack) expect.
#[must_use]
pub fn s3_source(name: &str, credentials: &S3Credentials, endpoint_host: &str) -> Value {
    json!({
        "entityType": "source",
        "name": name,
        "type": "S3",
        "config": {
            "accessKey": credentials.access_key(),
            "accessSecret": credentials.secret_key(),
            "secure": "false",
            "allowCreateDrop": "true",
            "rootPath": "/",
            "credentialType": "ACCESS_KEY",
            "enableAsync": "true",
            "compatibilityMode": "true",
            "isCachingEnabled": "true",
            "maxCacheSpacePct": 100,
            "requesterPays": "false",
            "enableFileStatusCheck": "true",
            "propertyList": [
                { "name": "fs.s3a.path.style.access", "value": "true" },
                { "name": "fs.s3a.endpoint", "value": endpoint_host },
            ],
        },
    })
}

/// Body for promoting a folder to a physical dataset.
#[must_use]
pub fn promote_folder(path: &CatalogPath, format: DataFormat) -> Value {
    json!({
        "entityType": "dataset",
        "id": path.catalog_id(),
        "path": path.segments(),
        "type": "PHYSICAL_DATASET",
        "format": { "type": format.dremio_format_type() },
    })
}

/// Body for `POST /api/v3/sql`.
#[must_use]
pub fn sql(statement: &str) -> Value {
    json!({ "sql": statement })
}

/// Body for creating a space.
#[must_use]
pub fn space(name: &str) -> Value {
    json!({ "entityType": "space", "name": name })
}

/// Body for creating a virtual dataset inside a space.
#[must_use]
pub fn virtual_dataset(space: &str, name: &str, sql: &str, context: &CatalogPath) -> Value {
    json!({
        "entityType": "dataset",
        "path": [space, name],
        "type": "VIRTUAL_DATASET",
        "sql": sql,
        "sqlContext": context.segments(),
    })
}

/// Body for `PUT /api/v3/catalog/{id}` replacing a virtual dataset's SQL.
///
/// `tag` is the version tag read from the current entity; Dremio rejects the
/// update when the entity changed in between.
#[must_use]
pub fn virtual_dataset_update(
    id: &str,
    tag: &str,
    path: &[String],
    sql: &str,
    context: &CatalogPath,
) -> Value {
    json!({
        "entityType": "dataset",
        "id": id,
        "tag": tag,
        "path": path,
        "type": "VIRTUAL_DATASET",
        "sql": sql,
        "sqlContext": context.segments(),
    })
}

/// Body for `POST /api/v3/user`.
#[must_use]
pub fn user(user: &ExtraUser) -> Value {
    json!({
        "name": user.name,
        "firstName": user.first_name,
        "password": user.password,
    })
}
