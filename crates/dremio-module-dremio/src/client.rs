// crates/dremio-module-dremio/src/client.rs
// ============================================================================
// Module: Dremio Client
// Description: Blocking REST client for Dremio catalog, SQL, and user APIs.
// Purpose: Issue bounded requests and map responses to typed results.
// Dependencies: dremio-module-config, dremio-module-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`DremioClient`] is rooted at the server base URL. Login yields a
//! [`Session`] whose token is attached to every v3 call. Writes that hit an
//! existing object (HTTP 409) report [`Creation::AlreadyExists`] so that a
//! restarted module can run the whole workflow again.
//! Invariants:
//! - Path segments are percent-encoded individually; catalog ids are sent as
//!   a single encoded segment.
//! - Response bodies above `max_response_bytes` fail closed.
//! - An empty success body is treated as "no content", never as malformed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::thread;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use dremio_module_config::DremioSettings;
use dremio_module_config::ExtraUser;
use dremio_module_core::CatalogPath;
use dremio_module_core::DataFormat;
use dremio_module_core::S3Credentials;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::DremioError;
use crate::payloads;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Authorization value Dremio expects before any user exists.
const BOOTSTRAP_AUTHORIZATION: &str = "_dremionull";
/// Prefix of the session authorization header value.
const SESSION_PREFIX: &str = "_dremio";
/// Path prefix of the v3 REST API.
const API_V3: [&str; 2] = ["api", "v3"];
/// Path prefix of the v2 REST API.
const API_V2: &str = "apiv2";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the Dremio client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DremioClientConfig {
    /// Server base URL.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl DremioClientConfig {
    /// Derives the client configuration from module settings.
    #[must_use]
    pub fn from_settings(settings: &DremioSettings) -> Self {
        Self {
            base_url: settings.url.clone(),
            timeout_ms: settings.request_timeout_ms,
            ..Self::default()
        }
    }
}

impl Default for DremioClientConfig {
    fn default() -> Self {
        Self {
            base_url: DremioSettings::default().url,
            timeout_ms: 30_000,
            max_response_bytes: 4 * 1024 * 1024,
            user_agent: "dremio-module/0.1".to_string(),
        }
    }
}

/// Job polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPolling {
    /// Delay between polls.
    pub interval: Duration,
    /// Maximum number of polls.
    pub attempts: u32,
}

impl JobPolling {
    /// Builds the polling budget from module settings.
    #[must_use]
    pub const fn from_settings(settings: &DremioSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.job_poll_interval_ms),
            attempts: settings.job_poll_attempts,
        }
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Authenticated Dremio session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Full `Authorization` header value.
    authorization: String,
}

impl Session {
    /// Wraps a login token.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        Self {
            authorization: format!("{SESSION_PREFIX}{token}"),
        }
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> &str {
        &self.authorization
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session(<redacted>)")
    }
}

/// Outcome of a create-style call.
#[derive(Debug, Clone, PartialEq)]
pub enum Creation {
    /// The object was created; carries the response body, if any.
    Created(Option<Value>),
    /// The object already existed.
    AlreadyExists,
}

/// Stored definition of an existing virtual dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDatasetEntity {
    /// Catalog id.
    pub id: String,
    /// Version tag required for updates.
    pub tag: String,
    /// Full catalog path.
    pub path: Vec<String>,
    /// SQL the view currently serves.
    pub sql: String,
}

impl VirtualDatasetEntity {
    /// Reads the entity from a catalog response.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError::Malformed`] when the entity is not a virtual
    /// dataset or lacks its id, tag, path, or SQL.
    pub fn from_catalog(entity: &Value) -> Result<Self, DremioError> {
        if entity.get("type").and_then(Value::as_str) != Some("VIRTUAL_DATASET") {
            return Err(DremioError::Malformed(
                "catalog entry is not a virtual dataset".to_string(),
            ));
        }
        let text = |field: &str| {
            entity.get(field).and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
                DremioError::Malformed(format!("virtual dataset lacks {field}"))
            })
        };
        let path: Vec<String> = entity
            .get("path")
            .and_then(Value::as_array)
            .map(|segments| {
                segments.iter().filter_map(Value::as_str).map(str::to_string).collect()
            })
            .ok_or_else(|| DremioError::Malformed("virtual dataset lacks path".to_string()))?;
        Ok(Self {
            id: text("id")?,
            tag: text("tag")?,
            path,
            sql: text("sql")?,
        })
    }
}

/// Identifier of a submitted SQL job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(String);

impl JobId {
    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reported state of a SQL job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Canceled before completion.
    Canceled,
    /// Any non-terminal state (`RUNNING`, `ENQUEUED`, ...).
    Pending(String),
}

impl JobState {
    /// Parses the `jobState` field.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "CANCELED" | "CANCELLED" => Self::Canceled,
            other => Self::Pending(other.to_string()),
        }
    }

    /// Returns the state label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::Pending(other) => other.as_str(),
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking Dremio REST client.
pub struct DremioClient {
    /// Server base URL.
    base: Url,
    /// Maximum response size allowed, in bytes.
    max_response_bytes: usize,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl DremioClient {
    /// Creates a Dremio client.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError::Client`] when the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: DremioClientConfig) -> Result<Self, DremioError> {
        let base = Url::parse(&config.base_url)
            .map_err(|err| DremioError::Client(format!("invalid base url: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(DremioError::Client("base url cannot carry a path".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent)
            .build()
            .map_err(|err| DremioError::Client(err.to_string()))?;
        Ok(Self {
            base,
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }

    /// Returns the `host:port` the server listens on.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError::Client`] when the base URL lacks a host or port.
    pub fn socket_address(&self) -> Result<String, DremioError> {
        let host = self
            .base
            .host_str()
            .ok_or_else(|| DremioError::Client("base url has no host".to_string()))?;
        let port = self
            .base
            .port_or_known_default()
            .ok_or_else(|| DremioError::Client("base url has no port".to_string()))?;
        Ok(format!("{host}:{port}"))
    }

    /// Registers the first (admin) user on a fresh server.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] for transport failures or any rejection other
    /// than "user already exists".
    pub fn bootstrap_first_user(&self, settings: &DremioSettings) -> Result<Creation, DremioError> {
        let url = self.endpoint(&[API_V2, "bootstrap", "firstuser"])?;
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        let request = self
            .client
            .put(url)
            .header(AUTHORIZATION, BOOTSTRAP_AUTHORIZATION)
            .json(&payloads::first_user(settings, created_at));
        match self.execute(request) {
            Err(DremioError::Status {
                status,
                body,
            }) if status == StatusCode::BAD_REQUEST.as_u16()
                && body.to_ascii_lowercase().contains("already") =>
            {
                Ok(Creation::AlreadyExists)
            }
            other => creation(other),
        }
    }

    /// Logs in and returns a session.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the login is rejected or the response
    /// lacks a `token`.
    pub fn login(&self, user: &str, password: &str) -> Result<Session, DremioError> {
        let url = self.endpoint(&[API_V2, "login"])?;
        let body = self.execute(self.client.post(url).json(&payloads::login(user, password)))?;
        body.as_ref()
            .and_then(|body| body.get("token"))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(Session::from_token)
            .ok_or_else(|| DremioError::Malformed("login response lacks token".to_string()))
    }

    /// Creates an S3 source.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the request fails or is rejected.
    pub fn create_s3_source(
        &self,
        session: &Session,
        name: &str,
        credentials: &S3Credentials,
        endpoint_host: &str,
    ) -> Result<Creation, DremioError> {
        let url = self.v3(&["catalog"])?;
        let body = payloads::s3_source(name, credentials, endpoint_host);
        creation(self.execute(authorized(self.client.post(url), session).json(&body)))
    }

    /// Looks up a catalog entity by path.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the entity is missing or the response is
    /// empty.
    pub fn catalog_by_path(
        &self,
        session: &Session,
        path: &CatalogPath,
    ) -> Result<Value, DremioError> {
        let mut segments = vec!["catalog", "by-path"];
        segments.extend(path.segments().iter().map(String::as_str));
        let url = self.v3(&segments)?;
        self.execute(authorized(self.client.get(url), session))?
            .ok_or_else(|| DremioError::Malformed("empty catalog entry".to_string()))
    }

    /// Promotes a folder to a physical dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the request fails or is rejected.
    pub fn promote_folder(
        &self,
        session: &Session,
        path: &CatalogPath,
        format: DataFormat,
    ) -> Result<Creation, DremioError> {
        let catalog_id = path.catalog_id();
        let url = self.v3(&["catalog", &catalog_id])?;
        let body = payloads::promote_folder(path, format);
        creation(self.execute(authorized(self.client.post(url), session).json(&body)))
    }

    /// Submits a SQL statement and returns its job id.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the request fails or the response lacks an
    /// `id`.
    pub fn submit_sql(&self, session: &Session, statement: &str) -> Result<JobId, DremioError> {
        let url = self.v3(&["sql"])?;
        let body = self.execute(
            authorized(self.client.post(url), session).json(&payloads::sql(statement)),
        )?;
        body.as_ref()
            .and_then(|body| body.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(|id| JobId(id.to_string()))
            .ok_or_else(|| DremioError::Malformed("sql response lacks job id".to_string()))
    }

    /// Returns the current state of a job.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the request fails or `jobState` is absent.
    pub fn job_state(&self, session: &Session, job: &JobId) -> Result<JobState, DremioError> {
        let url = self.v3(&["job", job.as_str()])?;
        let body = self.execute(authorized(self.client.get(url), session))?;
        body.as_ref()
            .and_then(|body| body.get("jobState"))
            .and_then(Value::as_str)
            .map(JobState::parse)
            .ok_or_else(|| DremioError::Malformed("job response lacks jobState".to_string()))
    }

    /// Polls a job until it completes.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError::JobFailed`] for a failed or canceled job and
    /// [`DremioError::JobTimeout`] when the polling budget runs out.
    pub fn wait_for_job(
        &self,
        session: &Session,
        job: &JobId,
        polling: JobPolling,
    ) -> Result<(), DremioError> {
        for attempt in 1..=polling.attempts {
            match self.job_state(session, job)? {
                JobState::Completed => return Ok(()),
                state @ (JobState::Failed | JobState::Canceled) => {
                    return Err(DremioError::JobFailed {
                        job: job.to_string(),
                        state: state.as_str().to_string(),
                    });
                }
                JobState::Pending(_) => {
                    if attempt < polling.attempts {
                        thread::sleep(polling.interval);
                    }
                }
            }
        }
        Err(DremioError::JobTimeout {
            job: job.to_string(),
            attempts: polling.attempts,
        })
    }

    /// Returns the column names of a completed job's result set.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the request fails or `schema` is absent.
    pub fn job_columns(&self, session: &Session, job: &JobId) -> Result<Vec<String>, DremioError> {
        let url = self.v3(&["job", job.as_str(), "results"])?;
        let body = self.execute(authorized(self.client.get(url), session))?;
        let Some(Value::Array(schema)) = body.as_ref().and_then(|body| body.get("schema")) else {
            return Err(DremioError::Malformed("job results lack schema".to_string()));
        };
        schema
            .iter()
            .map(|field| {
                field.get("name").and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
                    DremioError::Malformed("schema field lacks name".to_string())
                })
            })
            .collect()
    }

    /// Returns the columns of a table by running an empty query against it.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the query cannot be run to completion.
    pub fn table_columns(
        &self,
        session: &Session,
        path: &CatalogPath,
        polling: JobPolling,
    ) -> Result<Vec<String>, DremioError> {
        let statement = format!("SELECT * FROM {} LIMIT 0", path.sql_reference());
        let job = self.submit_sql(session, &statement)?;
        self.wait_for_job(session, &job, polling)?;
        self.job_columns(session, &job)
    }

    /// Creates a space.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the request fails or is rejected.
    pub fn create_space(&self, session: &Session, name: &str) -> Result<Creation, DremioError> {
        let url = self.v3(&["catalog"])?;
        let body = payloads::space(name);
        creation(self.execute(authorized(self.client.post(url), session).json(&body)))
    }

    /// Creates a virtual dataset in a space.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the request fails or is rejected.
    pub fn create_virtual_dataset(
        &self,
        session: &Session,
        space: &str,
        name: &str,
        sql: &str,
        context: &CatalogPath,
    ) -> Result<Creation, DremioError> {
        let url = self.v3(&["catalog"])?;
        let body = payloads::virtual_dataset(space, name, sql, context);
        creation(self.execute(authorized(self.client.post(url), session).json(&body)))
    }

    /// Reads the definition of an existing virtual dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the lookup fails or the entry is not a
    /// virtual dataset.
    pub fn virtual_dataset(
        &self,
        session: &Session,
        path: &CatalogPath,
    ) -> Result<VirtualDatasetEntity, DremioError> {
        VirtualDatasetEntity::from_catalog(&self.catalog_by_path(session, path)?)
    }

    /// Replaces the SQL of an existing virtual dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the request fails or is rejected,
    /// including a stale version tag.
    pub fn update_virtual_dataset(
        &self,
        session: &Session,
        existing: &VirtualDatasetEntity,
        sql: &str,
        context: &CatalogPath,
    ) -> Result<(), DremioError> {
        let url = self.v3(&["catalog", &existing.id])?;
        let body = payloads::virtual_dataset_update(
            &existing.id,
            &existing.tag,
            &existing.path,
            sql,
            context,
        );
        self.execute(authorized(self.client.put(url), session).json(&body)).map(|_| ())
    }

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns [`DremioError`] when the request fails or is rejected.
    pub fn create_user(
        &self,
        session: &Session,
        user: &ExtraUser,
    ) -> Result<Creation, DremioError> {
        let url = self.v3(&["user"])?;
        let body = payloads::user(user);
        creation(self.execute(authorized(self.client.post(url), session).json(&body)))
    }

    /// Builds a URL under the base path from raw segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, DremioError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| DremioError::Client("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Builds a v3 API URL.
    fn v3(&self, segments: &[&str]) -> Result<Url, DremioError> {
        let full: Vec<&str> = API_V3.iter().chain(segments).copied().collect();
        self.endpoint(&full)
    }

    /// Sends a request and returns its JSON body, if any.
    fn execute(&self, request: RequestBuilder) -> Result<Option<Value>, DremioError> {
        let mut response =
            request.send().map_err(|err| DremioError::Request(err.without_url().to_string()))?;
        let status = response.status();
        let body = read_response_limited(&mut response, self.max_response_bytes)?;
        if !status.is_success() {
            return Err(DremioError::status(status.as_u16(), &String::from_utf8_lossy(&body)));
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|_| DremioError::Malformed("response is not valid json".to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Attaches the session authorization header.
fn authorized(request: RequestBuilder, session: &Session) -> RequestBuilder {
    request.header(AUTHORIZATION, session.authorization())
}

/// Maps a create-style response, treating a conflict as an existing object.
fn creation(result: Result<Option<Value>, DremioError>) -> Result<Creation, DremioError> {
    match result {
        Ok(body) => Ok(Creation::Created(body)),
        Err(DremioError::Status {
            status, ..
        }) if status == StatusCode::CONFLICT.as_u16() => Ok(Creation::AlreadyExists),
        Err(err) => Err(err),
    }
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, DremioError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| DremioError::Request("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(DremioError::Request("dremio response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|_| DremioError::Request("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(DremioError::Request("dremio response exceeds size limit".to_string()));
    }
    Ok(buf)
}
