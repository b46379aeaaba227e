// crates/dremio-module-core/src/logging/tests.rs
// ============================================================================
// Module: Structured Logging Unit Tests
// Description: Validates JSON-line rendering and sink behavior.
// Purpose: Keep the emitted field names stable for platform log tooling.
// Dependencies: dremio-module-core, serde_json
// ============================================================================

//! ## Overview
//! Checks the rendered record layout and level parsing.

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

use serde_json::Value;
use serde_json::json;

use super::LogEvent;
use super::LogLevel;
use super::LogSink;
use super::MemoryLogSink;
use super::render_json_line;
use crate::dataset::DatasetId;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn record_uses_platform_field_names() {
    let dataset = DatasetId::parse("ns/asset").unwrap();
    let event = LogEvent::error("vault authentication failed")
        .dataset(&dataset)
        .for_user()
        .with_error("403")
        .field("endpoint", "http://vault:8200");
    let line = render_json_line(&event, "123", 42).unwrap();
    let value: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["level"], json!("error"));
    assert_eq!(value["time"], json!(42));
    assert_eq!(value["caller"], json!("dremio-module"));
    assert_eq!(value["app.fybrik.io/app-uuid"], json!("123"));
    assert_eq!(value["DataSetID"], json!("ns/asset"));
    assert_eq!(value["ForUser"], json!(true));
    assert_eq!(value["error"], json!("403"));
    assert_eq!(value["fields"]["endpoint"], json!("http://vault:8200"));
    assert!(!line.contains('\n'));
}

#[test]
fn optional_fields_are_omitted() {
    let line = render_json_line(&LogEvent::info("Finished!"), "app", 0).unwrap();
    let value: Value = serde_json::from_str(&line).unwrap();
    let object = value.as_object().unwrap();
    assert!(!object.contains_key("DataSetID"));
    assert!(!object.contains_key("ForUser"));
    assert!(!object.contains_key("error"));
    assert!(!object.contains_key("fields"));
}

#[test]
fn levels_parse_and_order() {
    assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
    assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert!("verbose".parse::<LogLevel>().is_err());
    assert!(LogLevel::Trace < LogLevel::Debug);
    assert!(LogLevel::Warn < LogLevel::Error);
}

#[test]
fn memory_sink_keeps_events_in_order() {
    let sink = MemoryLogSink::new();
    sink.record(&LogEvent::info("first"));
    sink.record(&LogEvent::debug("second"));
    let messages: Vec<String> = sink.events().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, ["first", "second"]);
    assert!(sink.contains_message("second"));
}
