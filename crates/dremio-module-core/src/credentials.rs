// crates/dremio-module-core/src/credentials.rs
// ============================================================================
// Module: Object Store Credentials
// Description: S3 access key pair handed from Vault to Dremio.
// Purpose: Keep secret material out of debug output and logs.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`S3Credentials`] carries the access key pair read from Vault into the
//! Dremio source definition. Its `Debug` output never shows the secret key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// S3 access key pair.
///
/// # Invariants
/// - Both keys are non-empty when produced by the Vault client.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Credentials {
    /// Access key identifier.
    access_key: String,
    /// Secret access key.
    secret_key: String,
}

impl S3Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Returns the access key identifier.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Returns the secret access key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
