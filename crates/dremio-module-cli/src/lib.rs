// crates/dremio-module-cli/src/lib.rs
// ============================================================================
// Module: Dremio Module CLI Library
// Description: Provisioning workflow shared by the binary and its tests.
// Purpose: Expose the end-to-end workflow behind a testable API.
// Dependencies: dremio-module-config, dremio-module-core, dremio-module-dremio,
//               dremio-module-vault
// ============================================================================

//! ## Overview
//! The `dremio-module` binary is a thin dispatcher; the provisioning workflow
//! lives in [`provision`] so it can be driven against stub servers.

pub mod provision;
