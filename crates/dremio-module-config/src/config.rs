// crates/dremio-module-config/src/config.rs
// ============================================================================
// Module: Dremio Module Configuration
// Description: Configuration loading and validation for the Dremio module.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: dremio-module-core, base64, serde, serde_yaml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from the YAML document the platform mounts into the
//! module pod. Every top-level key containing `data` lists datasets to expose;
//! an optional `dremio` section tunes the Dremio connection and an optional
//! `logging` section sets the log level. Governance actions arrive
//! base64-encoded per dataset and are decoded into a [`TransformPlan`] here so
//! that malformed policies fail at load time.
//! Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use dremio_module_core::DataFormat;
use dremio_module_core::DatasetId;
use dremio_module_core::LogLevel;
use dremio_module_core::TransformPlan;
use dremio_module_core::decode_actions;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Configuration path used when no override is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/conf/conf.yaml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "DREMIO_MODULE_CONFIG";
/// Environment variable overriding the Dremio admin password.
pub const ADMIN_PASSWORD_ENV_VAR: &str = "DREMIO_ADMIN_PASSWORD";
/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV_VAR: &str = "DREMIO_MODULE_LOG_LEVEL";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Default Vault address.
const DEFAULT_VAULT_ADDRESS: &str = "https://localhost:8200";
/// Default Vault login path.
const DEFAULT_VAULT_AUTH_PATH: &str = "/v1/auth/kubernetes/login";
/// Default Vault role.
const DEFAULT_VAULT_ROLE: &str = "demo";
/// Default Vault secret path.
const DEFAULT_VAULT_SECRET_PATH: &str = "/v1/secret/data/cred";
/// Default service-account token location.
const DEFAULT_JWT_FILE_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
/// Default in-cluster Dremio endpoint.
const DEFAULT_DREMIO_URL: &str = "http://dremio-client.fybrik-blueprints.svc.cluster.local:9047";

// ============================================================================
// SECTION: Dataset Configuration
// ============================================================================

/// Vault coordinates for the dataset's object-store credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VaultCredentials {
    /// Vault base address.
    #[serde(default = "default_vault_address")]
    pub address: String,
    /// Login path appended to the address.
    #[serde(rename = "authPath", default = "default_vault_auth_path")]
    pub auth_path: String,
    /// Vault role used for JWT login.
    #[serde(default = "default_vault_role")]
    pub role: String,
    /// Secret path appended to the address.
    #[serde(rename = "secretPath", default = "default_vault_secret_path")]
    pub secret_path: String,
    /// File holding the service-account JWT.
    #[serde(default = "default_jwt_file_path")]
    pub jwt_file_path: PathBuf,
}

impl Default for VaultCredentials {
    fn default() -> Self {
        Self {
            address: default_vault_address(),
            auth_path: default_vault_auth_path(),
            role: default_vault_role(),
            secret_path: default_vault_secret_path(),
            jwt_file_path: PathBuf::from(DEFAULT_JWT_FILE_PATH),
        }
    }
}

/// S3 connection details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct S3Connection {
    /// Object-store endpoint, with or without scheme.
    pub endpoint_url: String,
    /// Optional bucket name (informational; the path carries the bucket).
    #[serde(default)]
    pub bucket: Option<String>,
    /// Vault coordinates for the access keys.
    #[serde(default)]
    pub vault_credentials: VaultCredentials,
}

impl S3Connection {
    /// Returns the endpoint without its scheme, as Dremio's S3 source expects.
    #[must_use]
    pub fn endpoint_host(&self) -> &str {
        let endpoint = self.endpoint_url.trim();
        let host = endpoint.split_once("://").map_or(endpoint, |(_, rest)| rest);
        host.trim_end_matches('/')
    }
}

/// Validated dataset entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    /// Dataset identifier.
    pub id: DatasetId,
    /// Storage format.
    pub format: DataFormat,
    /// Folder path inside the object store.
    pub path: String,
    /// Connection details.
    pub connection: S3Connection,
    /// Column restrictions derived from governance actions.
    pub plan: TransformPlan,
}

impl DatasetConfig {
    /// Returns the Dremio source name for the dataset.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.id.asset()
    }

    /// Returns the virtual dataset name for the dataset.
    #[must_use]
    pub fn vds_name(&self) -> String {
        format!("{}-vds", self.id.asset())
    }
}

/// Dataset entry as written in the document.
#[derive(Debug, Deserialize)]
struct RawDataset {
    /// `<namespace>/<asset>` identifier.
    name: String,
    /// Format label.
    format: String,
    /// Object-store folder path.
    path: String,
    /// Connection block.
    connection: RawConnection,
    /// Base64-encoded JSON array of governance actions.
    #[serde(default)]
    transformations: Option<String>,
}

/// Connection block as written in the document.
#[derive(Debug, Deserialize)]
struct RawConnection {
    /// S3 connection details.
    s3: S3Connection,
}

// ============================================================================
// SECTION: Dremio Settings
// ============================================================================

/// Additional Dremio user created after provisioning.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ExtraUser {
    /// User name.
    pub name: String,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for ExtraUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraUser")
            .field("name", &self.name)
            .field("first_name", &self.first_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Dremio connection and workflow settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DremioSettings {
    /// Dremio REST base URL.
    pub url: String,
    /// Admin user bootstrapped on first start.
    pub admin_user: String,
    /// Admin password.
    pub admin_password: String,
    /// Admin first name.
    pub admin_first_name: String,
    /// Admin last name.
    pub admin_last_name: String,
    /// Admin email.
    pub admin_email: String,
    /// Space holding the virtual datasets.
    pub space: String,
    /// Number of readiness probe attempts.
    pub ready_attempts: u32,
    /// Delay between readiness probes in milliseconds.
    pub ready_interval_ms: u64,
    /// Delay between job status polls in milliseconds.
    pub job_poll_interval_ms: u64,
    /// Maximum number of job status polls.
    pub job_poll_attempts: u32,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Optional extra user to create.
    pub extra_user: Option<ExtraUser>,
}

impl Default for DremioSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DREMIO_URL.to_string(),
            admin_user: "adminUser".to_string(),
            admin_password: "adminPwd1".to_string(),
            admin_first_name: "user".to_string(),
            admin_last_name: "admin".to_string(),
            admin_email: "test@test.com".to_string(),
            space: "Space-api".to_string(),
            ready_attempts: 30,
            ready_interval_ms: 10_000,
            job_poll_interval_ms: 10_000,
            job_poll_attempts: 60,
            request_timeout_ms: 30_000,
            extra_user: None,
        }
    }
}

impl fmt::Debug for DremioSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DremioSettings")
            .field("url", &self.url)
            .field("admin_user", &self.admin_user)
            .field("admin_password", &"<redacted>")
            .field("space", &self.space)
            .field("ready_attempts", &self.ready_attempts)
            .field("ready_interval_ms", &self.ready_interval_ms)
            .field("job_poll_interval_ms", &self.job_poll_interval_ms)
            .field("job_poll_attempts", &self.job_poll_attempts)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("extra_user", &self.extra_user)
            .finish_non_exhaustive()
    }
}

impl DremioSettings {
    /// Validates Dremio settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.url)
            .map_err(|err| ConfigError::Invalid(format!("dremio.url: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("dremio.url must use http or https".to_string()));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid("dremio.url requires a host".to_string()));
        }
        if self.admin_user.trim().is_empty() || self.admin_password.is_empty() {
            return Err(ConfigError::Invalid(
                "dremio admin_user and admin_password must be set".to_string(),
            ));
        }
        if self.space.trim().is_empty() {
            return Err(ConfigError::Invalid("dremio.space must be set".to_string()));
        }
        if self.ready_attempts == 0 || self.job_poll_attempts == 0 {
            return Err(ConfigError::Invalid(
                "dremio ready_attempts and job_poll_attempts must be greater than zero"
                    .to_string(),
            ));
        }
        if self.ready_interval_ms == 0
            || self.job_poll_interval_ms == 0
            || self.request_timeout_ms == 0
        {
            return Err(ConfigError::Invalid(
                "dremio intervals and timeouts must be greater than zero".to_string(),
            ));
        }
        if let Some(user) = &self.extra_user
            && (user.name.trim().is_empty() || user.password.is_empty())
        {
            return Err(ConfigError::Invalid(
                "dremio.extra_user requires name and password".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Logging Settings
// ============================================================================

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Minimum level written.
    pub level: LogLevel,
    /// Application instance identifier stamped on every record.
    pub app_uuid: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            app_uuid: "unknown".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Module Configuration
// ============================================================================

/// Complete module configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleConfig {
    /// Datasets to expose, in document order.
    pub datasets: Vec<DatasetConfig>,
    /// Dremio settings.
    pub dremio: DremioSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl ModuleConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Environment overrides are applied before validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::parse_yaml(content)?;
        config.apply_overrides(
            env::var(ADMIN_PASSWORD_ENV_VAR).ok(),
            env::var(LOG_LEVEL_ENV_VAR).ok(),
        )?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_yaml(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses the document without validating cross-field rules.
    fn parse_yaml(content: &str) -> Result<Self, ConfigError> {
        let document: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let serde_yaml::Value::Mapping(root) = document else {
            return Err(ConfigError::Invalid("config root must be a mapping".to_string()));
        };
        let mut config = Self::default();
        for (key, value) in root {
            let Some(key) = key.as_str() else {
                continue;
            };
            if key == "dremio" {
                config.dremio = serde_yaml::from_value(value)
                    .map_err(|err| ConfigError::Parse(format!("dremio: {err}")))?;
            } else if key == "logging" {
                config.logging = serde_yaml::from_value(value)
                    .map_err(|err| ConfigError::Parse(format!("logging: {err}")))?;
            } else if key.contains("data") {
                let entries: Vec<RawDataset> = serde_yaml::from_value(value)
                    .map_err(|err| ConfigError::Parse(format!("{key}: {err}")))?;
                for (idx, entry) in entries.into_iter().enumerate() {
                    config.datasets.push(build_dataset(key, idx, entry)?);
                }
            }
        }
        Ok(config)
    }

    /// Applies environment-style overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the log level override is not a level.
    pub fn apply_overrides(
        &mut self,
        admin_password: Option<String>,
        log_level: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(password) = admin_password.filter(|value| !value.is_empty()) {
            self.dremio.admin_password = password;
        }
        if let Some(level) = log_level.filter(|value| !value.trim().is_empty()) {
            self.logging.level = level.parse().map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.datasets.is_empty() {
            return Err(ConfigError::Invalid("config lists no datasets".to_string()));
        }
        let mut assets = BTreeSet::new();
        for dataset in &self.datasets {
            if !assets.insert(dataset.id.asset()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate dataset asset name: {}",
                    dataset.id.asset()
                )));
            }
        }
        self.dremio.validate()
    }
}

/// Converts a raw dataset entry into a validated one.
fn build_dataset(key: &str, idx: usize, raw: RawDataset) -> Result<DatasetConfig, ConfigError> {
    let label = format!("{key}[{idx}]");
    let id = DatasetId::parse(&raw.name)
        .map_err(|err| ConfigError::Invalid(format!("{label}.name: {err}")))?;
    let format: DataFormat =
        raw.format.parse().map_err(|err| ConfigError::Invalid(format!("{label}.format: {err}")))?;
    if raw.path.trim_matches('/').is_empty() {
        return Err(ConfigError::Invalid(format!("{label}.path must be set")));
    }
    let connection = raw.connection.s3;
    if connection.endpoint_host().is_empty() {
        return Err(ConfigError::Invalid(format!("{label}.connection.s3.endpoint_url must be set")));
    }
    validate_vault(&label, &connection.vault_credentials)?;
    let plan = match raw.transformations.as_deref().map(str::trim) {
        None | Some("") => TransformPlan::default(),
        Some(encoded) => decode_transformations(encoded)
            .map_err(|err| ConfigError::Invalid(format!("{label}.transformations: {err}")))?,
    };
    Ok(DatasetConfig {
        id,
        format,
        path: raw.path,
        connection,
        plan,
    })
}

/// Decodes the base64 governance action payload.
///
/// # Errors
///
/// Returns a message when the payload is not base64 or not a valid action list.
pub fn decode_transformations(encoded: &str) -> Result<TransformPlan, String> {
    let bytes = STANDARD.decode(encoded).map_err(|err| format!("invalid base64: {err}"))?;
    let actions = decode_actions(&bytes).map_err(|err| err.to_string())?;
    Ok(TransformPlan::new(actions))
}

/// Validates Vault coordinates.
fn validate_vault(label: &str, vault: &VaultCredentials) -> Result<(), ConfigError> {
    let address = Url::parse(&vault.address).map_err(|err| {
        ConfigError::Invalid(format!("{label}.vault_credentials.address: {err}"))
    })?;
    if !matches!(address.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!(
            "{label}.vault_credentials.address must use http or https"
        )));
    }
    if !vault.auth_path.starts_with('/') || !vault.secret_path.starts_with('/') {
        return Err(ConfigError::Invalid(format!(
            "{label}.vault_credentials paths must start with '/'"
        )));
    }
    if vault.role.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{label}.vault_credentials.role must be set")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// YAML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Serde default for the Vault address.
fn default_vault_address() -> String {
    DEFAULT_VAULT_ADDRESS.to_string()
}

/// Serde default for the Vault login path.
fn default_vault_auth_path() -> String {
    DEFAULT_VAULT_AUTH_PATH.to_string()
}

/// Serde default for the Vault role.
fn default_vault_role() -> String {
    DEFAULT_VAULT_ROLE.to_string()
}

/// Serde default for the Vault secret path.
fn default_vault_secret_path() -> String {
    DEFAULT_VAULT_SECRET_PATH.to_string()
}

/// Serde default for the JWT file path.
fn default_jwt_file_path() -> PathBuf {
    PathBuf::from(DEFAULT_JWT_FILE_PATH)
}
