//! MCP type definitions
//!
//! Shared shapes used by the pool, the control plane and the CLI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool advertised by a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments
    #[serde(default)]
    pub input_schema: Value,
}

/// Tool listing payload, shaped like the protocol's list-tools result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolList {
    pub tools: Vec<ToolInfo>,
}

/// Snapshot of the eager-initialization flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitStatus {
    pub initializing: bool,
    pub initialized: bool,
}

/// Health of one live connection as seen by the last tool listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Error,
}

/// One entry of the status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetail {
    pub name: String,
    /// `None` when tools were not listed or the listing failed
    pub tools_count: Option<usize>,
    pub status: ConnectionState,
}
