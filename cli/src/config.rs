//! Server definitions and the JSON config store
//!
//! The store file uses the common `mcpServers` layout so configs from other
//! MCP clients can be imported as-is:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "fs": { "command": "npx", "args": ["-y", "@modelcontextprotocol/server-filesystem", "."] },
//!     "remote": { "type": "http", "url": "http://localhost:8080/mcp" }
//!   }
//! }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory under the home directory holding config, logs and state
pub const STATE_DIR_NAME: &str = ".mcps";

/// Config file name inside the state directory
pub const CONFIG_FILE_NAME: &str = "mcp.json";

/// State directory (`~/.mcps`)
pub fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STATE_DIR_NAME)
}

/// Default config store path (`~/.mcps/mcp.json`)
pub fn default_config_path() -> PathBuf {
    default_state_dir().join(CONFIG_FILE_NAME)
}

/// A resolved server definition, keyed by `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub transport: TransportConfig,
    /// Skipped by eager initialization, still connectable on demand
    pub disabled: bool,
}

/// How to reach a tool-providing server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Spawned subprocess speaking over stdin/stdout
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    /// Persistent network stream
    Http { url: String },
}

impl TransportConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Stdio { .. } => "stdio",
            TransportConfig::Http { .. } => "http",
        }
    }
}

/// Contents of the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: BTreeMap<String, ServerEntry>,
}

/// One raw `mcpServers` entry as written on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl ServerEntry {
    /// Entry for a subprocess server
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: Some("stdio".to_string()),
            command: Some(command.into()),
            args,
            ..Self::default()
        }
    }

    /// Entry for a network-stream server
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            kind: Some("http".to_string()),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Resolve the entry into a [`ServerConfig`].
    ///
    /// An explicit `type` wins; otherwise a `command` means stdio and a `url`
    /// means a network stream. `sse` and `streamable-http` are accepted as
    /// names for the network transport.
    pub fn to_server_config(&self, name: &str) -> Result<ServerConfig> {
        let kind = match self.kind.as_deref() {
            Some(kind) => kind,
            None if self.command.is_some() => "stdio",
            None if self.url.is_some() => "http",
            None => bail!("Server \"{}\" is missing command or url", name),
        };

        let transport = match kind {
            "stdio" => {
                let command = self
                    .command
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .with_context(|| format!("Server \"{}\" has type stdio but no command", name))?;
                TransportConfig::Stdio {
                    command,
                    args: self.args.clone(),
                    env: self.env.clone(),
                }
            }
            "http" | "sse" | "streamable-http" => {
                let url = self
                    .url
                    .clone()
                    .with_context(|| format!("Server \"{}\" has type {} but no url", name, kind))?;
                url::Url::parse(&url)
                    .with_context(|| format!("Server \"{}\" has an invalid url: {}", name, url))?;
                TransportConfig::Http { url }
            }
            other => bail!("Server \"{}\" has unknown type \"{}\"", name, other),
        };

        Ok(ServerConfig {
            name: name.to_string(),
            transport,
            disabled: self.disabled,
        })
    }
}

/// Field changes applied by [`JsonConfigStore::update_server`]
#[derive(Debug, Clone, Default)]
pub struct ServerUpdate {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub url: Option<String>,
    pub disabled: Option<bool>,
}

impl ServerUpdate {
    pub fn is_empty(&self) -> bool {
        self.command.is_none() && self.args.is_none() && self.url.is_none() && self.disabled.is_none()
    }
}

/// Outcome of [`JsonConfigStore::import`]
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub updated: Vec<String>,
    /// Skipped names with the reason
    pub skipped: Vec<(String, String)>,
}

/// Read access to server definitions
pub trait ConfigStore: Send + Sync {
    /// All servers that resolve cleanly, in name order
    fn list_servers(&self) -> Result<Vec<ServerConfig>>;

    fn get_server(&self, name: &str) -> Result<Option<ServerConfig>>;
}

/// File-backed config store.
///
/// Reads go to disk every time so the daemon sees servers added after it
/// started.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file; a missing file is an empty config
    pub fn load(&self) -> Result<McpConfig> {
        if !self.path.exists() {
            tracing::debug!("No config at {}, using empty config", self.path.display());
            return Ok(McpConfig::default());
        }
        Self::load_from_path(&self.path)
    }

    /// Load an `mcpServers` file from a specific path
    pub fn load_from_path(path: &Path) -> Result<McpConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: McpConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        Ok(config)
    }

    /// Write the config, replacing the file atomically
    pub fn save(&self, config: &McpConfig) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let content = serde_json::to_string_pretty(config)?;
        let tmp = dir.join(format!(".{}.tmp", CONFIG_FILE_NAME));
        std::fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    pub fn add_server(&self, name: &str, entry: ServerEntry) -> Result<()> {
        entry.to_server_config(name)?;
        let mut config = self.load()?;
        if config.mcp_servers.contains_key(name) {
            bail!("Server \"{}\" already exists", name);
        }
        config.mcp_servers.insert(name.to_string(), entry);
        self.save(&config)
    }

    pub fn remove_server(&self, name: &str) -> Result<()> {
        let mut config = self.load()?;
        if config.mcp_servers.remove(name).is_none() {
            bail!("Server \"{}\" not found", name);
        }
        self.save(&config)
    }

    pub fn update_server(&self, name: &str, update: ServerUpdate) -> Result<()> {
        let mut config = self.load()?;
        let entry = config
            .mcp_servers
            .get_mut(name)
            .with_context(|| format!("Server \"{}\" not found", name))?;

        if let Some(command) = update.command {
            entry.command = Some(command);
        }
        if let Some(args) = update.args {
            entry.args = args;
        }
        if let Some(url) = update.url {
            entry.url = Some(url);
        }
        if let Some(disabled) = update.disabled {
            entry.disabled = disabled;
        }
        entry.to_server_config(name)?;

        self.save(&config)
    }

    /// Merge servers from another `mcpServers` config.
    ///
    /// Disabled and unresolvable entries are skipped. Existing names are
    /// skipped unless `force` is set, in which case they are overwritten.
    pub fn import(&self, source: &McpConfig, force: bool) -> Result<ImportReport> {
        let mut config = self.load()?;
        let mut report = ImportReport::default();

        for (name, entry) in &source.mcp_servers {
            if entry.disabled {
                report.skipped.push((name.clone(), "disabled".to_string()));
                continue;
            }
            if let Err(e) = entry.to_server_config(name) {
                report.skipped.push((name.clone(), format!("{:#}", e)));
                continue;
            }
            if config.mcp_servers.contains_key(name) {
                if !force {
                    report
                        .skipped
                        .push((name.clone(), "already exists (use --force to overwrite)".to_string()));
                    continue;
                }
                report.updated.push(name.clone());
            } else {
                report.imported.push(name.clone());
            }
            config.mcp_servers.insert(name.clone(), entry.clone());
        }

        if !report.imported.is_empty() || !report.updated.is_empty() {
            self.save(&config)?;
        }
        Ok(report)
    }
}

impl ConfigStore for JsonConfigStore {
    fn list_servers(&self) -> Result<Vec<ServerConfig>> {
        let config = self.load()?;
        let servers = config
            .mcp_servers
            .iter()
            .filter_map(|(name, entry)| match entry.to_server_config(name) {
                Ok(server) => Some(server),
                Err(e) => {
                    tracing::warn!("Ignoring invalid server config: {:#}", e);
                    None
                }
            })
            .collect();
        Ok(servers)
    }

    fn get_server(&self, name: &str) -> Result<Option<ServerConfig>> {
        let config = self.load()?;
        config
            .mcp_servers
            .get(name)
            .map(|entry| entry.to_server_config(name))
            .transpose()
    }
}
