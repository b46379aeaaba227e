// crates/dremio-module-core/src/transform/tests.rs
// ============================================================================
// Module: Column Transformation Unit Tests
// Description: Validates action decoding and projection query generation.
// Purpose: Ensure restricted columns never leak into virtual datasets.
// Dependencies: dremio-module-core
// ============================================================================

//! ## Overview
//! Covers governance action decoding and SELECT-list construction.

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

use super::ColumnTransformation;
use super::TransformError;
use super::TransformKind;
use super::TransformPlan;
use super::decode_actions;
use super::projection_query;
use super::quote_identifier;
use super::visible_columns;
use crate::dataset::CatalogPath;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

fn redact(names: &[&str]) -> ColumnTransformation {
    ColumnTransformation {
        kind: TransformKind::Redact,
        action_name: "RedactAction".to_string(),
        columns: columns(names),
    }
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

#[test]
fn decodes_named_action_with_columns() {
    let payload = br#"[{"name":"RedactAction","RedactAction":{"columns":["nameOrig","nameDest"]}}]"#;
    let actions = decode_actions(payload).unwrap();
    assert_eq!(actions, vec![redact(&["nameOrig", "nameDest"])]);
}

#[test]
fn decodes_remove_action_and_missing_columns() {
    let payload = br#"[{"name":"RemoveColumn","RemoveColumn":{"columns":["a"]}},{"name":"RedactAction"}]"#;
    let actions = decode_actions(payload).unwrap();
    assert_eq!(actions[0].kind, TransformKind::Remove);
    assert_eq!(actions[0].columns, columns(&["a"]));
    assert_eq!(actions[1].kind, TransformKind::Redact);
    assert!(actions[1].columns.is_empty());
}

#[test]
fn unknown_action_fails_closed() {
    let payload = br#"[{"name":"EncryptAction","EncryptAction":{"columns":["a"]}}]"#;
    assert_eq!(
        decode_actions(payload).unwrap_err(),
        TransformError::UnknownAction("EncryptAction".to_string())
    );
}

#[test]
fn malformed_payloads_are_rejected() {
    assert!(matches!(decode_actions(b"not json"), Err(TransformError::InvalidJson(_))));
    assert!(matches!(decode_actions(br#"{"name":"x"}"#), Err(TransformError::Malformed(_))));
    assert!(matches!(decode_actions(br"[42]"), Err(TransformError::Malformed(_))));
    assert!(matches!(decode_actions(br#"[{"columns":[]}]"#), Err(TransformError::Malformed(_))));
    assert!(matches!(
        decode_actions(br#"[{"name":"RedactAction","RedactAction":{"columns":[1]}}]"#),
        Err(TransformError::Malformed(_))
    ));
    assert!(matches!(
        decode_actions(br#"[{"name":"RedactAction","RedactAction":{"columns":"a"}}]"#),
        Err(TransformError::Malformed(_))
    ));
}

// ============================================================================
// SECTION: Plan and Projection
// ============================================================================

#[test]
fn plan_merges_columns_in_first_seen_order() {
    let plan = TransformPlan::new(vec![redact(&["b", "a"]), redact(&["a", "c"])]);
    assert_eq!(plan.restricted_columns(), columns(&["b", "a", "c"]));
    assert!(plan.is_restricted("c"));
    assert!(!plan.is_restricted("d"));
}

#[test]
fn empty_plan_keeps_every_column() {
    let plan = TransformPlan::default();
    assert!(plan.is_empty());
    let table = columns(&["x", "y"]);
    assert_eq!(visible_columns(&table, &plan), table);
}

#[test]
fn projection_excludes_restricted_columns() {
    let path = CatalogPath::from_source_and_path("sample-iceberg", "warehouse/db/table");
    let plan = TransformPlan::new(vec![redact(&["nameOrig"])]);
    let query = projection_query(&path, &columns(&["step", "nameOrig", "amount"]), &plan).unwrap();
    assert_eq!(
        query,
        r#"SELECT "step", "amount" FROM "sample-iceberg"."warehouse"."db"."table""#
    );
}

#[test]
fn projection_is_none_when_all_columns_restricted() {
    let path = CatalogPath::from_source_and_path("src", "t");
    let plan = TransformPlan::new(vec![redact(&["a", "b"])]);
    assert!(projection_query(&path, &columns(&["a", "b"]), &plan).is_none());
    assert!(projection_query(&path, &[], &TransformPlan::default()).is_none());
}

#[test]
fn identifiers_escape_embedded_quotes() {
    assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
}
