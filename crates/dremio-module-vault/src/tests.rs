// crates/dremio-module-vault/src/tests.rs
// ============================================================================
// Module: Vault Client Unit Tests
// Description: Validates secret extraction and token file handling.
// Purpose: Pin fail-closed behavior for incomplete credentials.
// Dependencies: dremio-module-vault, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Covers helpers that do not need a live Vault endpoint.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only validation helpers use panic-based assertions for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use super::VaultError;
use super::VaultToken;
use super::extract_s3_credentials;
use super::join_url;
use super::read_jwt;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn extracts_complete_key_pair() {
    let creds =
        extract_s3_credentials(&object(json!({"access_key": "AKIA", "secret_key": "s3cr3t"})))
            .unwrap();
    assert_eq!(creds.access_key(), "AKIA");
    assert_eq!(creds.secret_key(), "s3cr3t");
    assert!(!format!("{creds:?}").contains("s3cr3t"));
}

#[test]
fn rejects_missing_or_empty_keys() {
    let cases = [
        (json!({"access_key": "AKIA"}), "expected both"),
        (json!({}), "expected both"),
        (json!({"access_key": "", "secret_key": "x"}), "'access_key' must be non-empty"),
        (json!({"access_key": "x", "secret_key": ""}), "'secret_key' must be non-empty"),
        (json!({"access_key": "", "secret_key": null}), "must be non-empty"),
    ];
    for (data, needle) in cases {
        let err = extract_s3_credentials(&object(data)).unwrap_err();
        assert!(matches!(err, VaultError::MissingCredentials(_)));
        assert!(err.to_string().contains(needle), "{err}");
    }
}

#[test]
fn jwt_is_trimmed() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"  eyJhbGciOi.payload.sig\n").unwrap();
    assert_eq!(read_jwt(file.path()).unwrap(), "eyJhbGciOi.payload.sig");
}

#[test]
fn empty_or_missing_jwt_fails() {
    let file = tempfile::NamedTempFile::new().unwrap();
    assert!(matches!(read_jwt(file.path()), Err(VaultError::Jwt(_))));
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(read_jwt(&dir.path().join("token")), Err(VaultError::Jwt(_))));
}

#[test]
fn urls_join_without_double_slash() {
    assert_eq!(join_url("http://vault:8200/", "/v1/auth"), "http://vault:8200/v1/auth");
    assert_eq!(join_url("http://vault:8200", "/v1/auth"), "http://vault:8200/v1/auth");
}

#[test]
fn token_debug_is_redacted() {
    let token = VaultToken("hvs.secret".to_string());
    assert_eq!(format!("{token:?}"), "VaultToken(<redacted>)");
    assert_eq!(token.expose(), "hvs.secret");
}
