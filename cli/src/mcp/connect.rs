//! rmcp-backed connections
//!
//! Subprocess servers run through `TokioChildProcess`; network servers use
//! the streamable HTTP client transport. Either way the result is a running
//! rmcp client service wrapped in an [`RmcpHandle`].

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation},
    service::{Peer, RunningService},
    transport::{StreamableHttpClientTransport, TokioChildProcess},
    ClientHandler, RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::sync::Mutex;

use super::handle::{ClientHandle, Connector};
use super::types::{ToolInfo, ToolList};
use crate::config::{ServerConfig, TransportConfig};

/// Client name announced during the handshake
const CLIENT_NAME: &str = "mcps";

/// Identifies this client to servers during initialization
#[derive(Clone)]
pub struct McpsClientHandler {
    info: ClientInfo,
}

impl McpsClientHandler {
    pub fn new() -> Self {
        Self {
            info: ClientInfo {
                protocol_version: Default::default(),
                capabilities: ClientCapabilities::default(),
                client_info: Implementation {
                    name: CLIENT_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    title: None,
                    description: None,
                    icons: None,
                    website_url: None,
                },
                meta: None,
            },
        }
    }
}

impl Default for McpsClientHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientHandler for McpsClientHandler {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }
}

type McpService = RunningService<RoleClient, McpsClientHandler>;

/// Live rmcp connection
pub struct RmcpHandle {
    name: String,
    peer: Peer<RoleClient>,
    /// Taken on close so cancellation happens once
    service: Mutex<Option<McpService>>,
}

impl RmcpHandle {
    fn new(name: String, service: McpService) -> Self {
        Self {
            name,
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        }
    }
}

#[async_trait]
impl ClientHandle for RmcpHandle {
    async fn list_tools(&self) -> Result<ToolList> {
        let response = self
            .peer
            .list_tools(Default::default())
            .await
            .with_context(|| format!("Failed to list tools on {}", self.name))?;

        let tools = response
            .tools
            .into_iter()
            .map(|t| ToolInfo {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()),
                input_schema: Value::Object(t.input_schema.as_ref().clone()),
            })
            .collect();

        Ok(ToolList { tools })
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<Value> {
        tracing::debug!(server = %self.name, tool = %name, "Calling tool");

        let result = self
            .peer
            .call_tool(CallToolRequestParams {
                name: name.to_string().into(),
                arguments: Some(arguments),
                task: None,
                meta: None,
            })
            .await
            .with_context(|| format!("Tool '{}' on server '{}' failed", name, self.name))?;

        serde_json::to_value(result).context("Failed to encode tool result")
    }

    async fn close(&self) -> Result<()> {
        let service = self.service.lock().await.take();
        if let Some(service) = service {
            tracing::debug!("Cancelling MCP service: {}", self.name);
            service
                .cancel()
                .await
                .with_context(|| format!("Failed to cancel MCP service {}", self.name))?;
        }
        Ok(())
    }
}

/// Opens rmcp connections for both transport kinds
#[derive(Clone, Default)]
pub struct RmcpConnector {
    handler: McpsClientHandler,
}

impl RmcpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    async fn connect_stdio(
        &self,
        name: &str,
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<McpService> {
        tracing::info!(server = %name, command = %command, args = ?args, "Spawning MCP server");

        let mut cmd = Command::new(command);
        cmd.args(args).kill_on_drop(true);
        for (key, value) in env {
            let expanded = shellexpand::env(value).unwrap_or_else(|_| value.clone().into());
            cmd.env(key, expanded.as_ref());
        }
        // Own process group: a Ctrl+C aimed at the daemon must not reach the children
        #[cfg(unix)]
        cmd.process_group(0);

        let transport = TokioChildProcess::new(cmd).with_context(|| {
            format!(
                "Failed to spawn MCP server: {}. Ensure '{}' is installed and in PATH.",
                name, command
            )
        })?;

        self.handler
            .clone()
            .serve(transport)
            .await
            .with_context(|| format!("Failed to initialize MCP server: {}", name))
    }

    async fn connect_http(&self, name: &str, url: &str) -> Result<McpService> {
        tracing::info!(server = %name, url = %url, "Connecting to MCP server");

        let transport = StreamableHttpClientTransport::from_uri(url.to_string());
        self.handler
            .clone()
            .serve(transport)
            .await
            .with_context(|| format!("Failed to initialize MCP server: {}", name))
    }
}

#[async_trait]
impl Connector for RmcpConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ClientHandle>> {
        let service = match &config.transport {
            TransportConfig::Stdio { command, args, env } => {
                self.connect_stdio(&config.name, command, args, env).await?
            }
            TransportConfig::Http { url } => self.connect_http(&config.name, url).await?,
        };

        tracing::debug!(server = %config.name, peer = ?service.peer_info(), "Handshake complete");
        Ok(Arc::new(RmcpHandle::new(config.name.clone(), service)))
    }
}
