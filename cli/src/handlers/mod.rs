//! Command handlers
//!
//! One module per command group. [`CommandContext`] carries the global flags
//! and builds the config store and daemon client on demand.

pub mod call;
pub mod config;
pub mod daemon;
pub mod logs;
pub mod server;
pub mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{Cli, Commands, DaemonCommands};
use crate::config::{default_config_path, JsonConfigStore};
use crate::daemon::{DaemonClient, Supervisor};

/// Shared context for command handlers
pub struct CommandContext {
    pub port: u16,
    pub config_path: PathBuf,
    /// Whether `--config`/`MCPS_CONFIG` was given, so it can be forwarded
    explicit_config: bool,
    pub verbose: u8,
}

impl CommandContext {
    pub fn new(port: u16, config: Option<PathBuf>, verbose: u8) -> Self {
        let explicit_config = config.is_some();
        Self {
            port,
            config_path: config.unwrap_or_else(default_config_path),
            explicit_config,
            verbose,
        }
    }

    pub fn store(&self) -> JsonConfigStore {
        JsonConfigStore::new(&self.config_path)
    }

    pub fn shared_store(&self) -> Arc<JsonConfigStore> {
        Arc::new(self.store())
    }

    pub fn client(&self) -> DaemonClient {
        DaemonClient::new(self.port)
    }

    /// Supervisor that spawns daemons with this context's port and config
    pub fn supervisor(&self) -> Supervisor {
        let config = self.explicit_config.then(|| self.config_path.clone());
        Supervisor::new(self.port, config)
    }

    /// Check if verbose mode is enabled (any -v flag)
    pub fn is_verbose(&self) -> bool {
        self.verbose >= 1
    }
}

/// Dispatch a parsed command line to its handler
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = CommandContext::new(cli.port, cli.config, cli.verbose);

    match cli.command {
        Commands::Daemon { command } => {
            daemon::run_daemon_command(&ctx, command.unwrap_or(DaemonCommands::Start)).await
        }
        Commands::Call { server, tool, args } => call::run_call(&ctx, &server, &tool, &args).await,
        Commands::Tools { server, simple } => tools::run_tools(&ctx, &server, simple).await,
        Commands::Server { command } => server::run_server_command(&ctx, command),
        Commands::Config { command } => config::run_config_command(&ctx, command),
    }
}
