//! Connection pool
//!
//! Owns at most one live [`ClientHandle`] per server name. Connections are
//! created lazily by [`ConnectionPool::get_client`] or eagerly by
//! [`ConnectionPool::initialize_all`], and torn down best-effort.
//!
//! Per-name lifecycle: `Absent -> Connecting -> Connected -> Closed`. A failed
//! or timed-out connect leaves the name `Absent`, so the next caller retries.
//!
//! Concurrent `get_client` calls for the same absent name are coalesced: a
//! per-name gate admits one connect attempt at a time and every waiter checks
//! the map again once it gets through.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{Mutex, RwLock};

use super::handle::{ClientHandle, Connector};
use super::types::{ConnectionDetail, ConnectionState, InitStatus};
use crate::config::{ConfigStore, ServerConfig};
use crate::error::PoolError;

/// Per-connection bound used by eager initialization
pub const INIT_CONNECT_TIMEOUT: Duration = Duration::from_millis(8000);

type Handle = Arc<dyn ClientHandle>;

pub struct ConnectionPool {
    store: Arc<dyn ConfigStore>,
    connector: Arc<dyn Connector>,
    clients: RwLock<HashMap<String, Handle>>,
    /// One gate per name that has ever been connected
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    initializing: AtomicBool,
    initialized: AtomicBool,
    init_timeout: Duration,
}

impl ConnectionPool {
    pub fn new(store: Arc<dyn ConfigStore>, connector: Arc<dyn Connector>) -> Self {
        Self {
            store,
            connector,
            clients: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            initializing: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            init_timeout: INIT_CONNECT_TIMEOUT,
        }
    }

    /// Override the per-connection bound used by [`Self::initialize_all`]
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Run a config store read off the async workers; file-backed stores
    /// do blocking I/O
    async fn read_store<T, F>(&self, read: F) -> anyhow::Result<T>
    where
        F: FnOnce(&dyn ConfigStore) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || read(store.as_ref()))
            .await
            .context("Config store read was aborted")?
    }

    async fn lookup(&self, name: &str) -> Option<Handle> {
        self.clients.read().await.get(name).cloned()
    }

    async fn gate(&self, name: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        Arc::clone(gates.entry(name.to_string()).or_default())
    }

    /// Return the live handle for `name`, connecting if needed.
    ///
    /// With a `timeout`, gives up waiting once it expires and fails with
    /// [`PoolError::ConnectTimeout`]. Nothing is inserted on failure.
    pub async fn get_client(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<Handle, PoolError> {
        if let Some(handle) = self.lookup(name).await {
            return Ok(handle);
        }

        let lookup_name = name.to_string();
        let config = self
            .read_store(move |store| store.get_server(&lookup_name))
            .await
            .map_err(|source| PoolError::Config { source })?
            .ok_or_else(|| PoolError::NotFound(name.to_string()))?;

        let attempt = self.connect_gated(&config);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| PoolError::ConnectTimeout {
                    name: name.to_string(),
                    timeout: limit,
                })?,
            None => attempt.await,
        }
    }

    async fn connect_gated(&self, config: &ServerConfig) -> Result<Handle, PoolError> {
        let gate = self.gate(&config.name).await;
        let _guard = gate.lock().await;

        // Another caller may have finished connecting while we waited
        if let Some(handle) = self.lookup(&config.name).await {
            return Ok(handle);
        }

        tracing::debug!("Connecting to {} ({})", config.name, config.transport.kind());
        let handle = self
            .connector
            .connect(config)
            .await
            .map_err(|source| PoolError::Transport {
                name: config.name.clone(),
                source,
            })?;

        self.clients
            .write()
            .await
            .insert(config.name.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Close and forget one connection. Returns false if there was none.
    pub async fn close_client(&self, name: &str) -> bool {
        let removed = self.clients.write().await.remove(name);
        match removed {
            Some(handle) => {
                tracing::info!("Closing connection to {}...", name);
                if let Err(e) = handle.close().await {
                    tracing::warn!("Error closing {}: {:#}", name, e);
                }
                true
            }
            None => false,
        }
    }

    /// Close every connection, tolerating individual failures
    pub async fn close_all(&self) {
        let drained: Vec<(String, Handle)> = self.clients.write().await.drain().collect();

        for (name, handle) in drained {
            tracing::info!("Closing connection to {}...", name);
            if let Err(e) = handle.close().await {
                tracing::warn!("Error closing {}: {:#}", name, e);
            }
        }
    }

    /// Connect every enabled server, one after another, each bounded by its
    /// own timeout. Failures are logged; this never fails.
    pub async fn initialize_all(&self) {
        self.initializing.store(true, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);

        let servers = match self.read_store(|store| store.list_servers()).await {
            Ok(servers) => servers,
            Err(e) => {
                tracing::error!("Failed to read server config: {:#}", e);
                Vec::new()
            }
        };

        let enabled: Vec<ServerConfig> = servers
            .into_iter()
            .filter(|server| {
                if server.disabled {
                    tracing::info!("Skipping disabled server: {}", server.name);
                }
                !server.disabled
            })
            .collect();

        if enabled.is_empty() {
            tracing::info!("No enabled servers to initialize.");
        } else {
            tracing::info!("Initializing {} connection(s)...", enabled.len());
            for server in &enabled {
                tracing::info!("Connecting to server: {}...", server.name);
                match self.get_client(&server.name, Some(self.init_timeout)).await {
                    Ok(_) => tracing::info!("Connected to {}", server.name),
                    Err(e) => tracing::warn!("{}", e),
                }
            }
        }

        self.initializing.store(false, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
        tracing::info!("Initialization complete.");
    }

    pub fn init_status(&self) -> InitStatus {
        InitStatus {
            initializing: self.initializing.load(Ordering::SeqCst),
            initialized: self.initialized.load(Ordering::SeqCst),
        }
    }

    /// Report every live connection, sorted by name.
    ///
    /// With `include_tools`, each handle is asked for its tool count; a failed
    /// listing marks that entry as `error` but keeps it in the pool.
    pub async fn active_connection_details(&self, include_tools: bool) -> Vec<ConnectionDetail> {
        let mut handles: Vec<(String, Handle)> = self
            .clients
            .read()
            .await
            .iter()
            .map(|(name, handle)| (name.clone(), Arc::clone(handle)))
            .collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));

        let mut details = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let (tools_count, status) = if include_tools {
                match handle.list_tools().await {
                    Ok(list) => (Some(list.tools.len()), ConnectionState::Connected),
                    Err(e) => {
                        tracing::debug!("Tool listing failed for {}: {:#}", name, e);
                        (None, ConnectionState::Error)
                    }
                }
            } else {
                (None, ConnectionState::Connected)
            };
            details.push(ConnectionDetail {
                name,
                tools_count,
                status,
            });
        }
        details
    }

    /// Names with a live handle, sorted
    pub async fn connected_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
