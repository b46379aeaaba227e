// crates/dremio-module-vault/src/lib.rs
// ============================================================================
// Module: Vault Credential Client
// Description: Kubernetes-JWT login and object-store secret retrieval.
// Purpose: Resolve S3 access keys for a dataset without exposing them.
// Dependencies: dremio-module-config, dremio-module-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The module authenticates to Vault with the pod's service-account JWT,
//! exchanges it for a client token, and reads the dataset's S3 access key
//! pair from the configured secret path. Every failure is logged as a
//! user-facing event tagged with the dataset id, then returned as a
//! [`VaultError`].
//! Invariants:
//! - Tokens and secret values are never logged or included in errors.
//! - Both `access_key` and `secret_key` must be present and non-empty.
//! - Response bodies larger than the configured limit fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use dremio_module_config::VaultCredentials;
use dremio_module_core::DatasetId;
use dremio_module_core::LogEvent;
use dremio_module_core::LogSink;
use dremio_module_core::S3Credentials;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the Vault client token.
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";
/// Maximum size of a service-account token file.
const MAX_JWT_BYTES: u64 = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while resolving credentials from Vault.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never contain token or secret values.
#[derive(Debug, Error)]
pub enum VaultError {
    /// HTTP client could not be built.
    #[error("vault client build failed: {0}")]
    Client(String),
    /// Service-account token could not be read.
    #[error("service account token unavailable: {0}")]
    Jwt(String),
    /// Request could not be sent or its body read.
    #[error("vault request failed: {0}")]
    Request(String),
    /// Login was rejected.
    #[error("vault authentication failed with status {0}")]
    Auth(u16),
    /// Login response lacked `auth.client_token`.
    #[error("malformed vault authorization response")]
    MalformedAuth,
    /// Secret read was rejected.
    #[error("error reading credentials from vault: status {0}")]
    Secret(u16),
    /// Secret response lacked a `data` object.
    #[error("malformed secret response: {0}")]
    MalformedSecret(String),
    /// Secret lacked usable S3 keys.
    #[error("vault credentials are missing: {0}")]
    MissingCredentials(String),
}

// ============================================================================
// SECTION: Token
// ============================================================================

/// Vault client token.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultToken(String);

impl VaultToken {
    /// Returns the raw token for use in the request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VaultToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultToken(<redacted>)")
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the Vault client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultClientConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for VaultClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_response_bytes: 256 * 1024,
            user_agent: "dremio-module/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking Vault client.
pub struct VaultClient {
    /// Client configuration.
    config: VaultClientConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl VaultClient {
    /// Creates a Vault client.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Client`] when the HTTP client cannot be built.
    pub fn new(config: VaultClientConfig) -> Result<Self, VaultError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| VaultError::Client(err.to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Exchanges a service-account JWT for a Vault client token.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the request fails, is rejected, or the
    /// response lacks `auth.client_token`.
    pub fn login(
        &self,
        address: &str,
        auth_path: &str,
        role: &str,
        jwt: &str,
    ) -> Result<VaultToken, VaultError> {
        let url = join_url(address, auth_path);
        let mut response = self
            .client
            .post(url)
            .json(&json!({ "jwt": jwt, "role": role }))
            .send()
            .map_err(|err| VaultError::Request(err.without_url().to_string()))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(VaultError::Auth(status.as_u16()));
        }
        let body = self.read_json(&mut response)?;
        body.get("auth")
            .and_then(|auth| auth.get("client_token"))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(|token| VaultToken(token.to_string()))
            .ok_or(VaultError::MalformedAuth)
    }

    /// Reads a secret and returns its `data` object.
    ///
    /// KV version 2 responses nest the payload under `data.data`; that inner
    /// object is returned when present.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the request fails, is rejected, or the
    /// response lacks a `data` object.
    pub fn read_secret(
        &self,
        address: &str,
        secret_path: &str,
        token: &VaultToken,
    ) -> Result<Map<String, Value>, VaultError> {
        let url = join_url(address, secret_path);
        let mut response = self
            .client
            .get(url)
            .header(VAULT_TOKEN_HEADER, token.expose())
            .send()
            .map_err(|err| VaultError::Request(err.without_url().to_string()))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(VaultError::Secret(status.as_u16()));
        }
        let body = self.read_json(&mut response)?;
        let Some(Value::Object(data)) = body.get("data") else {
            return Err(VaultError::MalformedSecret(
                "expected the 'data' field in json".to_string(),
            ));
        };
        if let Some(Value::Object(inner)) = data.get("data")
            && data.contains_key("metadata")
        {
            return Ok(inner.clone());
        }
        Ok(data.clone())
    }

    /// Resolves the S3 access key pair for a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the JWT cannot be read, Vault rejects the
    /// login or secret read, or the secret lacks usable keys.
    pub fn fetch_s3_credentials(
        &self,
        vault: &VaultCredentials,
        dataset: &DatasetId,
        log: &dyn LogSink,
    ) -> Result<S3Credentials, VaultError> {
        let jwt = read_jwt(&vault.jwt_file_path).inspect_err(|err| {
            log.record(
                &LogEvent::error("failed to read service account token")
                    .dataset(dataset)
                    .for_user()
                    .with_error(err),
            );
        })?;
        let auth_url = join_url(&vault.address, &vault.auth_path);
        log.record(
            &LogEvent::trace("authenticating against vault using a JWT token")
                .dataset(dataset)
                .field("full_auth_path", auth_url),
        );
        let token =
            self.login(&vault.address, &vault.auth_path, &vault.role, &jwt).inspect_err(|err| {
                log.record(
                    &LogEvent::error("vault authentication failed")
                        .dataset(dataset)
                        .for_user()
                        .with_error(err),
                );
            })?;
        let secret_url = join_url(&vault.address, &vault.secret_path);
        let secret =
            self.read_secret(&vault.address, &vault.secret_path, &token).inspect_err(|err| {
                log.record(
                    &LogEvent::error("error reading credentials from vault")
                        .dataset(dataset)
                        .for_user()
                        .with_error(err),
                );
            })?;
        log.record(
            &LogEvent::debug("credentials received from vault")
                .dataset(dataset)
                .for_user()
                .field("credentials_path", secret_url),
        );
        extract_s3_credentials(&secret).inspect_err(|err| {
            log.record(
                &LogEvent::error("vault secret does not hold usable S3 keys")
                    .dataset(dataset)
                    .for_user()
                    .with_error(err),
            );
        })
    }

    /// Reads a JSON response body while enforcing the size limit.
    fn read_json(&self, response: &mut Response) -> Result<Value, VaultError> {
        let body = read_response_limited(response, self.config.max_response_bytes)?;
        serde_json::from_slice(&body)
            .map_err(|_| VaultError::Request("response is not valid json".to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the service-account JWT from disk.
///
/// # Errors
///
/// Returns [`VaultError::Jwt`] when the file is unreadable, too large, or empty.
pub fn read_jwt(path: &Path) -> Result<String, VaultError> {
    let metadata = fs::metadata(path).map_err(|err| VaultError::Jwt(err.to_string()))?;
    if metadata.len() > MAX_JWT_BYTES {
        return Err(VaultError::Jwt("token file exceeds size limit".to_string()));
    }
    let raw = fs::read_to_string(path).map_err(|err| VaultError::Jwt(err.to_string()))?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(VaultError::Jwt("token file is empty".to_string()));
    }
    Ok(token.to_string())
}

/// Extracts the S3 key pair from a secret's data object.
///
/// # Errors
///
/// Returns [`VaultError::MissingCredentials`] when either key is absent or empty.
pub fn extract_s3_credentials(data: &Map<String, Value>) -> Result<S3Credentials, VaultError> {
    let access_key = data.get("access_key");
    let secret_key = data.get("secret_key");
    let (Some(access_key), Some(secret_key)) = (access_key, secret_key) else {
        return Err(VaultError::MissingCredentials(
            "expected both 'access_key' and 'secret_key' fields in vault secret".to_string(),
        ));
    };
    let access_key = access_key.as_str().unwrap_or_default();
    let secret_key = secret_key.as_str().unwrap_or_default();
    match (access_key.is_empty(), secret_key.is_empty()) {
        (false, false) => Ok(S3Credentials::new(access_key, secret_key)),
        (true, true) => Err(VaultError::MissingCredentials(
            "'access_key' and 'secret_key' must be non-empty".to_string(),
        )),
        (true, false) => {
            Err(VaultError::MissingCredentials("'access_key' must be non-empty".to_string()))
        }
        (false, true) => {
            Err(VaultError::MissingCredentials("'secret_key' must be non-empty".to_string()))
        }
    }
}

/// Joins a base address and an absolute path.
fn join_url(address: &str, path: &str) -> String {
    format!("{}{}", address.trim_end_matches('/'), path)
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, VaultError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| VaultError::Request("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(VaultError::Request("vault response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|_| VaultError::Request("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(VaultError::Request("vault response exceeds size limit".to_string()));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests;
