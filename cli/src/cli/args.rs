//! CLI argument definitions
//!
//! Contains the main CLI struct and Commands enum for clap parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use super::daemon_args::DaemonCommands;
use super::server_args::{ConfigCommands, ServerCommands};
use crate::daemon::DEFAULT_DAEMON_PORT;

#[derive(Parser)]
#[command(name = "mcps")]
#[command(about = "Call MCP server tools through a connection-sharing daemon")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Control-plane port of the daemon
    #[arg(long, env = "MCPS_DAEMON_PORT", default_value_t = DEFAULT_DAEMON_PORT, global = true)]
    pub port: u16,

    /// Server config file (default: ~/.mcps/mcp.json)
    #[arg(long, env = "MCPS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the background daemon (defaults to `start`)
    Daemon {
        #[command(subcommand)]
        command: Option<DaemonCommands>,
    },
    /// Call a tool on a server
    Call {
        /// Server name from the config
        server: String,
        /// Tool name
        tool: String,
        /// Arguments as key=value; values are parsed as JSON when possible
        args: Vec<String>,
    },
    /// List the tools a server provides
    Tools {
        /// Server name from the config
        server: String,
        /// Only print tool names
        #[arg(long, short)]
        simple: bool,
    },
    /// Manage configured servers
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },
    /// Import or inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

impl Cli {
    /// True for the hidden `daemon serve` entry point
    pub fn is_daemon_process(&self) -> bool {
        matches!(
            self.command,
            Commands::Daemon {
                command: Some(DaemonCommands::Serve)
            }
        )
    }
}
