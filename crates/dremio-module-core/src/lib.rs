// crates/dremio-module-core/src/lib.rs
// ============================================================================
// Module: Dremio Module Core
// Description: Shared domain types for the Dremio provisioning module.
// Purpose: Policy outcomes, column transformations, catalog paths, and logging.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `dremio-module-core` holds the pure, I/O-free pieces of the Dremio module:
//! the sample finance/PII rule, the column transformation plan that turns
//! policy actions into a projection query, Dremio catalog path helpers, the
//! S3 credential pair, and the structured JSON-line logging used by every
//! other crate.
//! Invariants:
//! - Nothing in this crate performs network or filesystem I/O; the only
//!   output is the stderr log sink.
//! - Restricted columns never appear in a generated projection query.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credentials;
pub mod dataset;
pub mod logging;
pub mod policy;
pub mod transform;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credentials::S3Credentials;
pub use dataset::CatalogPath;
pub use dataset::DataFormat;
pub use dataset::DatasetError;
pub use dataset::DatasetId;
pub use logging::LogEvent;
pub use logging::LogLevel;
pub use logging::LogSink;
pub use logging::MemoryLogSink;
pub use logging::NoopLogSink;
pub use logging::StderrLogSink;
pub use policy::PolicyInput;
pub use policy::PolicyOutcome;
pub use policy::evaluate_sample_rule;
pub use transform::ColumnTransformation;
pub use transform::TransformError;
pub use transform::TransformKind;
pub use transform::TransformPlan;
pub use transform::decode_actions;
pub use transform::projection_query;
pub use transform::visible_columns;
