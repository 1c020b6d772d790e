//! Contract between the pool and a protocol client

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use super::types::ToolList;
use crate::config::ServerConfig;

/// One open connection to a tool-providing server
#[async_trait]
pub trait ClientHandle: Send + Sync {
    async fn list_tools(&self) -> Result<ToolList>;

    /// Invoke a tool; the protocol's result is returned as JSON
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<Value>;

    /// Tear down the transport. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// Opens connections from server definitions
#[async_trait]
pub trait Connector: Send + Sync {
    /// Suspends until the handshake succeeds or fails
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ClientHandle>>;
}
