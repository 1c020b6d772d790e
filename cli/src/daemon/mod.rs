//! Connection-sharing daemon
//!
//! The daemon keeps one live MCP connection per configured server and exposes
//! them to short-lived `mcps` invocations over a local HTTP control plane.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   HTTP (127.0.0.1)   ┌──────────────────┐
//! │  mcps call  │ ←──────────────────→ │   mcps daemon    │
//! └─────────────┘                      └────────┬─────────┘
//!                                               │ ConnectionPool
//!                    ┌──────────────────────────┼──────────────────────────┐
//!                    ↓                          ↓                          ↓
//!            ┌───────────────┐        ┌───────────────┐        ┌───────────────┐
//!            │  filesystem   │        │    github     │        │    remote     │
//!            │   (stdio)     │        │   (stdio)     │        │    (http)     │
//!            └───────────────┘        └───────────────┘        └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! mcps daemon start     # spawn in the background and wait for readiness
//! mcps daemon status
//! mcps daemon stop
//! ```

mod client;
mod protocol;
mod server;
mod supervisor;

use std::path::PathBuf;

pub use client::DaemonClient;
pub use protocol::*;
pub use server::{bind, router, run, serve, ControlState, ShutdownReason};
pub use supervisor::{Readiness, Supervisor};

/// Control-plane port used when neither `--port` nor `MCPS_DAEMON_PORT` is set
pub const DEFAULT_DAEMON_PORT: u16 = 4100;

/// Log directory for the daemon (`~/.mcps/logs`)
pub fn default_log_dir() -> PathBuf {
    crate::config::default_state_dir().join("logs")
}

/// Base URL of the control plane on `port`
pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}
