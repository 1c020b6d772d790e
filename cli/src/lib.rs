//! mcps - a CLI for MCP servers backed by a connection-sharing daemon
//!
//! Short-lived `mcps` invocations talk to a long-running daemon over a local
//! HTTP control plane. The daemon owns one live connection per configured
//! server, so the spawn + handshake cost is paid once instead of per command.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod mcp;
