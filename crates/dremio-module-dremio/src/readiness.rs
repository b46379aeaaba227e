// crates/dremio-module-dremio/src/readiness.rs
// ============================================================================
// Module: Dremio Readiness Probe
// Description: Bounded TCP connect loop against the Dremio server.
// Purpose: Hold off provisioning until the server accepts connections.
// Dependencies: dremio-module-core
// ============================================================================

//! ## Overview
//! Dremio takes a while to start inside the cluster. The probe opens a TCP
//! connection to `host:port`, sleeping between failed attempts, and gives up
//! after a fixed number of tries.

use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::thread;
use std::time::Duration;

use dremio_module_core::LogEvent;
use dremio_module_core::LogSink;

use crate::DremioError;

/// Upper bound on a single connect attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Waits until `address` (`host:port`) accepts a TCP connection.
///
/// # Errors
///
/// Returns [`DremioError::NotReady`] after `attempts` failed connects.
pub fn wait_ready(
    address: &str,
    attempts: u32,
    interval: Duration,
    log: &dyn LogSink,
) -> Result<(), DremioError> {
    for attempt in 1..=attempts {
        log.record(&LogEvent::info("wait dremio").field("attempt", attempt));
        if try_connect(address) {
            log.record(&LogEvent::debug("dremio accepts connections").field("address", address));
            return Ok(());
        }
        if attempt < attempts {
            log.record(&LogEvent::info("sleeping, waiting dremio"));
            thread::sleep(interval);
        }
    }
    Err(DremioError::NotReady {
        address: address.to_string(),
        attempts,
    })
}

/// Attempts a single connection to any resolved address.
fn try_connect(address: &str) -> bool {
    let Ok(resolved) = address.to_socket_addrs() else {
        return false;
    };
    resolved.into_iter().any(|addr| TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok())
}
