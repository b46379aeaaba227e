// crates/dremio-module-dremio/src/lib.rs
// ============================================================================
// Module: Dremio REST Client
// Description: Blocking client for the Dremio v2/v3 REST APIs.
// Purpose: Provision sources, datasets, spaces, and users on a Dremio server.
// Dependencies: dremio-module-config, dremio-module-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! `dremio-module-dremio` wraps the handful of Dremio endpoints the module
//! needs: first-user bootstrap, login, catalog writes, SQL jobs, and user
//! creation. Request bodies are built in [`payloads`] so their shape can be
//! checked without a server; [`readiness`] probes the server socket before
//! any HTTP call is made.
//! Invariants:
//! - Response bodies are size-limited and parsed as JSON only when non-empty.
//! - Errors never carry credentials or session tokens.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod error;
pub mod payloads;
pub mod readiness;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::Creation;
pub use client::DremioClient;
pub use client::DremioClientConfig;
pub use client::JobId;
pub use client::JobPolling;
pub use client::JobState;
pub use client::Session;
pub use client::VirtualDatasetEntity;
pub use error::DremioError;
pub use readiness::wait_ready;
