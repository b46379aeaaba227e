// crates/dremio-module-config/src/lib.rs
// ============================================================================
// Module: Dremio Module Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for conf.yaml semantics.
// Dependencies: dremio-module-core, base64, serde, serde_yaml, url
// ============================================================================

//! ## Overview
//! `dremio-module-config` defines the configuration model for the Dremio
//! module: the datasets to expose, their object-store and Vault coordinates,
//! the governance actions attached to each, and the Dremio connection
//! settings. Validation is strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
