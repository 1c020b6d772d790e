//! In-memory stand-ins for the config store and the MCP transport

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::handle::{ClientHandle, Connector};
use super::types::{ToolInfo, ToolList};
use crate::config::{ConfigStore, ServerConfig, TransportConfig};

#[derive(Default)]
pub struct MemoryConfigStore {
    servers: BTreeMap<String, ServerConfig>,
    read_delay: Option<Duration>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.servers.insert(server.name.clone(), server);
        self
    }

    pub fn with_stdio(self, name: &str) -> Self {
        self.with_server(stdio_server(name, false))
    }

    pub fn with_disabled(self, name: &str) -> Self {
        self.with_server(stdio_server(name, true))
    }

    pub fn with_http(self, name: &str, url: &str) -> Self {
        self.with_server(ServerConfig {
            name: name.to_string(),
            transport: TransportConfig::Http {
                url: url.to_string(),
            },
            disabled: false,
        })
    }

    /// Make every read block the calling thread, like a slow disk
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    fn simulate_read(&self) {
        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }
    }
}

fn stdio_server(name: &str, disabled: bool) -> ServerConfig {
    ServerConfig {
        name: name.to_string(),
        transport: TransportConfig::Stdio {
            command: "fake-mcp-server".to_string(),
            args: vec![name.to_string()],
            env: BTreeMap::new(),
        },
        disabled,
    }
}

impl ConfigStore for MemoryConfigStore {
    fn list_servers(&self) -> Result<Vec<ServerConfig>> {
        self.simulate_read();
        Ok(self.servers.values().cloned().collect())
    }

    fn get_server(&self, name: &str) -> Result<Option<ServerConfig>> {
        self.simulate_read();
        Ok(self.servers.get(name).cloned())
    }
}

#[derive(Clone, Copy)]
enum Behavior {
    Fail,
    Hang,
    Delay(Duration),
}

/// Handle that serves one `echo` tool
pub struct FakeHandle {
    name: String,
    closed: AtomicBool,
    fail_list: bool,
    fail_close: bool,
}

impl FakeHandle {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientHandle for FakeHandle {
    async fn list_tools(&self) -> Result<ToolList> {
        if self.fail_list {
            bail!("{} stopped responding", self.name);
        }
        Ok(ToolList {
            tools: vec![ToolInfo {
                name: "echo".to_string(),
                description: Some("Echo a message back".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {"message": {"type": "string"}},
                    "required": ["message"]
                }),
            }],
        })
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<Value> {
        if name != "echo" {
            bail!("Unknown tool: {}", name);
        }
        let msg = arguments
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("missing message"))?;
        Ok(json!({
            "content": [{"type": "text", "text": msg}],
            "isError": false
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            bail!("{} refused to close", self.name);
        }
        Ok(())
    }
}

/// Connector whose outcome is scripted per server name
#[derive(Default)]
pub struct FakeConnector {
    behaviors: Mutex<HashMap<String, Behavior>>,
    failing_list: Vec<String>,
    failing_close: Vec<String>,
    connects: Mutex<HashMap<String, usize>>,
    handles: Mutex<HashMap<String, Arc<FakeHandle>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_behavior(self, name: &str, behavior: Behavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .insert(name.to_string(), behavior);
        self
    }

    pub fn failing(self, name: &str) -> Self {
        self.with_behavior(name, Behavior::Fail)
    }

    pub fn hanging(self, name: &str) -> Self {
        self.with_behavior(name, Behavior::Hang)
    }

    pub fn delayed(self, name: &str, delay: Duration) -> Self {
        self.with_behavior(name, Behavior::Delay(delay))
    }

    pub fn failing_list(mut self, name: &str) -> Self {
        self.failing_list.push(name.to_string());
        self
    }

    pub fn failing_close(mut self, name: &str) -> Self {
        self.failing_close.push(name.to_string());
        self
    }

    /// Let a previously failing server connect normally
    pub fn recover(&self, name: &str) {
        self.behaviors.lock().unwrap().remove(name);
    }

    pub fn connect_count(&self, name: &str) -> usize {
        self.connects.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Most recent handle created for `name`
    pub fn handle(&self, name: &str) -> Option<Arc<FakeHandle>> {
        self.handles.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ClientHandle>> {
        let name = config.name.clone();
        *self.connects.lock().unwrap().entry(name.clone()).or_insert(0) += 1;

        let behavior = self.behaviors.lock().unwrap().get(&name).copied();
        match behavior {
            Some(Behavior::Fail) => bail!("{} exited during handshake", name),
            Some(Behavior::Hang) => std::future::pending::<()>().await,
            Some(Behavior::Delay(delay)) => tokio::time::sleep(delay).await,
            None => {}
        }

        let handle = Arc::new(FakeHandle {
            fail_list: self.failing_list.contains(&name),
            fail_close: self.failing_close.contains(&name),
            closed: AtomicBool::new(false),
            name: name.clone(),
        });
        self.handles
            .lock()
            .unwrap()
            .insert(name, Arc::clone(&handle));
        Ok(handle as Arc<dyn ClientHandle>)
    }
}
