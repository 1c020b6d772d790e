//! Server and config subcommands

use std::path::PathBuf;

use clap::{ArgGroup, Subcommand, ValueEnum};

/// Transport selected by `mcps server add --type`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Stdio,
    Http,
}

#[derive(Subcommand, Debug)]
pub enum ServerCommands {
    /// List configured servers
    #[command(alias = "ls")]
    List,
    /// Add a server
    Add {
        /// Unique server name
        name: String,
        /// Transport type
        #[arg(long = "type", value_enum, default_value_t = TransportKind::Stdio)]
        kind: TransportKind,
        /// Executable for stdio servers
        #[arg(long)]
        command: Option<String>,
        /// Arguments for the executable
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        args: Vec<String>,
        /// Endpoint for http servers
        #[arg(long)]
        url: Option<String>,
        /// Environment override as KEY=VALUE (repeatable)
        #[arg(long = "env", short = 'e')]
        env: Vec<String>,
        /// Skip this server during eager initialization
        #[arg(long)]
        disabled: bool,
    },
    /// Remove a server
    #[command(alias = "rm")]
    Remove { name: String },
    /// Change fields of an existing server
    #[command(group(ArgGroup::new("state").args(["enable", "disable"])))]
    Update {
        name: String,
        #[arg(long)]
        command: Option<String>,
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        args: Option<Vec<String>>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Merge servers from another mcpServers JSON file
    Import {
        file: PathBuf,
        /// Overwrite servers that already exist
        #[arg(long, short)]
        force: bool,
    },
    /// Print the config file location
    Path,
}
