// crates/dremio-module-dremio/src/error.rs
// ============================================================================
// Module: Dremio Errors
// Description: Error type shared by the REST client and readiness probe.
// Purpose: Give callers stable variants for each failure class.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A single [`DremioError`] covers transport, status, job, and payload
//! failures.

use thiserror::Error;

/// Longest response body excerpt kept in a status error.
pub const MAX_ERROR_BODY_CHARS: usize = 512;

/// Errors raised while talking to Dremio.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `Status` bodies are truncated to [`MAX_ERROR_BODY_CHARS`].
#[derive(Debug, Error)]
pub enum DremioError {
    /// HTTP client could not be built or the base URL is unusable.
    #[error("dremio client error: {0}")]
    Client(String),
    /// Request could not be sent or its body read.
    #[error("dremio request failed: {0}")]
    Request(String),
    /// Server answered with a non-success status.
    #[error("dremio returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },
    /// Server never accepted a TCP connection.
    #[error("dremio at {address} not ready after {attempts} attempts")]
    NotReady {
        /// Probed `host:port`.
        address: String,
        /// Number of attempts made.
        attempts: u32,
    },
    /// SQL job ended in a failed or canceled state.
    #[error("dremio job {job} ended in state {state}")]
    JobFailed {
        /// Job identifier.
        job: String,
        /// Terminal state reported by the server.
        state: String,
    },
    /// SQL job did not complete within the polling budget.
    #[error("dremio job {job} did not complete after {attempts} polls")]
    JobTimeout {
        /// Job identifier.
        job: String,
        /// Number of polls made.
        attempts: u32,
    },
    /// Response body was not the expected JSON shape.
    #[error("malformed dremio response: {0}")]
    Malformed(String),
}

impl DremioError {
    /// Builds a status error, truncating the body excerpt.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }
}
